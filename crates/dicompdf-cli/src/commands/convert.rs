//! Convert command: turn a DICOM series into a single PDF.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use dicompdf_core::{BatchConverter, CancellationToken, DicomDecoder, FileOutcome};

use super::config::load_config;
use crate::inputs;

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory (defaults to the folder of the first input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Gamma exponent applied after rescaling
    #[arg(long)]
    contrast: Option<f64>,

    /// Raster resolution in dots per inch
    #[arg(long)]
    dpi: Option<u32>,

    /// Output file name (defaults to <parent directory>.pdf)
    #[arg(long)]
    name: Option<String>,
}

pub async fn run(args: ConvertArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(contrast) = args.contrast {
        config.normalize.contrast_factor = contrast;
    }
    if let Some(dpi) = args.dpi {
        config.render.dpi = dpi;
    }
    if let Some(name) = args.name {
        config.output.file_name = Some(name);
    }

    let decoder = DicomDecoder::new();
    let converter = BatchConverter::new(decoder, config)?;

    let files = inputs::discover(&args.input, &converter.config().input, &decoder)?;
    if files.is_empty() {
        eprintln!(
            "{} No DICOM files found for: {}",
            style("✗").red(),
            args.input
        );
    } else {
        println!(
            "{} Found {} files to convert",
            style("ℹ").blue(),
            files.len()
        );
    }

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| inputs::default_output_dir(&files));
    debug!("Delivering into {}", output_dir.display());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current file");
            interrupt.cancel();
        }
    });

    let progress = pb.clone();
    let report = tokio::task::spawn_blocking(move || {
        converter.run_with(&files, &output_dir, &token, &mut |event| {
            if let FileOutcome::Skipped(failure) = &event.outcome {
                progress.println(format!("{} {}", style("⚠").yellow(), failure));
            }
            progress.inc(1);
        })
    })
    .await?;

    pb.finish_and_clear();

    if !report.is_success() {
        eprintln!("{} {}", style("✗").red(), report.message);
        eprintln!("  Failure flags: {}", report.failure);
        std::process::exit(report.exit_code());
    }

    println!(
        "{} Converted {} pages in {:?}",
        style("✓").green(),
        report.pages_written,
        start.elapsed()
    );
    if !report.skipped.is_empty() {
        println!(
            "  {} {} files skipped",
            style("⚠").yellow(),
            report.skipped.len()
        );
    }
    println!("{}", report.message);

    Ok(())
}
