//! Input discovery for the conversion commands.

use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use tracing::{debug, trace};

use dicompdf_core::models::config::InputConfig;
use dicompdf_core::{ImageDecoder, InputFile};

/// Collect the inputs named by `input`, sorted by path.
///
/// A directory is walked recursively; anything else is treated as a glob
/// pattern. Files pass when their extension is on the allow-list, or when
/// they have no extension and the decoder's probe accepts them.
pub fn discover<D: ImageDecoder>(
    input: &str,
    config: &InputConfig,
    decoder: &D,
) -> anyhow::Result<Vec<InputFile>> {
    let pattern = if Path::new(input).is_dir() {
        let root = Pattern::escape(input);
        Path::new(&root).join("**").join("*").to_string_lossy().into_owned()
    } else {
        input.to_string()
    };
    debug!("Expanding input pattern {}", pattern);

    let mut paths: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let files = paths
        .into_iter()
        .map(InputFile::from_path)
        .filter(|file| accepts(file, config, decoder))
        .collect();

    Ok(files)
}

fn accepts<D: ImageDecoder>(file: &InputFile, config: &InputConfig, decoder: &D) -> bool {
    match file.extension() {
        Some(ext) => {
            let accepted = config.accepts_extension(&ext);
            if !accepted {
                trace!("Ignoring {} (extension)", file.name());
            }
            accepted
        }
        None if config.probe_unrecognized => decoder.probe(file),
        None => false,
    }
}

/// Default delivery directory: the folder holding the first input.
pub fn default_output_dir(files: &[InputFile]) -> PathBuf {
    files
        .first()
        .and_then(|f| Path::new(f.name()).parent().map(Path::to_path_buf))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."))
}
