//! Preview command: write normalized PNGs for a random sample of inputs.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use image::GrayImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, warn};

use dicompdf_core::{BatchConverter, DicomDecoder, InputFile, NormalizedImage};

use super::config::load_config;
use crate::inputs;

/// Arguments for the preview command.
#[derive(Args)]
pub struct PreviewArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Directory for the preview images
    #[arg(short, long, default_value = "preview")]
    output_dir: PathBuf,

    /// Number of files to sample (defaults to the configured sample size)
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Random seed for a reproducible sample
    #[arg(long)]
    seed: Option<u64>,

    /// Gamma exponent applied after rescaling
    #[arg(long)]
    contrast: Option<f64>,
}

pub async fn run(args: PreviewArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(contrast) = args.contrast {
        config.normalize.contrast_factor = contrast;
    }
    let count = args.count.unwrap_or(config.preview.sample_size);

    let decoder = DicomDecoder::new();
    let converter = BatchConverter::new(decoder, config)?;

    let files = inputs::discover(&args.input, &converter.config().input, &decoder)?;
    if files.is_empty() {
        anyhow::bail!("No DICOM files found for: {}", args.input);
    }

    let sample = sample_files(&files, count, args.seed);
    println!(
        "{} Previewing {} of {} files",
        style("ℹ").blue(),
        sample.len(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let mut written = 0;
    for file in sample {
        let normalized = match converter.preview(file) {
            Ok(image) => image,
            Err(failure) => {
                warn!("Skipping {}", failure);
                println!("{} {}", style("⚠").yellow(), failure);
                continue;
            }
        };

        let path = preview_path(&args.output_dir, file);
        write_png(&normalized, &path)?;
        debug!("Wrote preview {}", path.display());
        written += 1;
    }

    println!(
        "{} Wrote {} previews to {}",
        style("✓").green(),
        written,
        args.output_dir.display()
    );

    Ok(())
}

/// Pick up to `count` distinct files, in sampled order.
fn sample_files(files: &[InputFile], count: usize, seed: Option<u64>) -> Vec<&InputFile> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    files.choose_multiple(&mut rng, count).collect()
}

fn preview_path(dir: &Path, file: &InputFile) -> PathBuf {
    let stem = Path::new(file.name())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preview".to_string());
    dir.join(format!("{}.png", stem))
}

fn write_png(image: &NormalizedImage, path: &Path) -> anyhow::Result<()> {
    let raster = GrayImage::from_raw(
        image.columns() as u32,
        image.rows() as u32,
        image.to_gray_bytes(),
    )
    .ok_or_else(|| anyhow::anyhow!("Image buffer does not match its dimensions"))?;
    raster.save(path)?;
    Ok(())
}
