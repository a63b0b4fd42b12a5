//! Inspect command: show what the decoder reads from one file.

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use dicompdf_core::render::caption::page_title;
use dicompdf_core::{DicomDecoder, ImageDecoder, ImageMetadata, InputFile};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// DICOM file to inspect
    file: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Inspection<'a> {
    file: String,
    title: Option<String>,
    min: f64,
    max: f64,
    #[serde(flatten)]
    metadata: &'a ImageMetadata,
}

pub async fn run(args: InspectArgs) -> anyhow::Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("File not found: {}", args.file.display());
    }

    let file = InputFile::from_path(&args.file);
    let decoded = DicomDecoder::new().decode(&file)?;

    let samples = decoded.image.samples();
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let inspection = Inspection {
        file: file.name().to_string(),
        title: page_title(&decoded.metadata),
        min,
        max,
        metadata: &decoded.metadata,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    let meta = inspection.metadata;
    println!("{}", style(&inspection.file).bold());
    println!("  Patient:      {}", meta.patient_name);
    println!("  Series:       {}", meta.series_description);
    println!("  Instance:     {}", meta.instance_number);
    println!("  Slice:        {}", meta.slice_location);
    println!("  Study date:   {}", meta.study_date);
    println!("  Modality:     {}", meta.modality);
    println!("  Dimensions:   {} x {}", meta.columns, meta.rows);
    println!("  Value range:  {} .. {}", inspection.min, inspection.max);
    if let Some(title) = &inspection.title {
        println!("  Page title:   {}", title);
    }

    Ok(())
}
