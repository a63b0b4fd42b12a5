//! Batch pipeline tests with a scripted decoder.

use std::collections::HashMap;
use std::path::Path;

use dicompdf_core::error::DecodeFailureKind;
use dicompdf_core::{
    BatchConverter, BatchState, CancellationToken, ConversionConfig, DecodeFailure, DecodedImage,
    FailureMask, FileOutcome, ImageDecoder, ImageMetadata, InputFile, RawImage,
};
use lopdf::Document;
use ndarray::Array2;
use pretty_assertions::assert_eq;

/// Decoder returning prepared results keyed by input name.
#[derive(Default)]
struct ScriptedDecoder {
    images: HashMap<String, DecodedImage>,
}

impl ScriptedDecoder {
    fn with_image(mut self, name: &str, rows: usize, columns: usize, patient: &str) -> Self {
        let samples = Array2::from_shape_fn((rows, columns), |(r, c)| (r * columns + c) as f64 * 7.0);
        self.images.insert(
            name.to_string(),
            DecodedImage {
                image: RawImage::new(samples),
                metadata: ImageMetadata {
                    patient_name: patient.to_string(),
                    series_description: "AXIAL".to_string(),
                    rows: rows as u32,
                    columns: columns as u32,
                    ..Default::default()
                },
            },
        );
        self
    }
}

impl ImageDecoder for ScriptedDecoder {
    fn decode(&self, file: &InputFile) -> Result<DecodedImage, DecodeFailure> {
        self.images.get(file.name()).cloned().ok_or_else(|| {
            DecodeFailure::new(file.name(), DecodeFailureKind::Parse, "corrupted")
        })
    }

    fn probe(&self, file: &InputFile) -> bool {
        self.images.contains_key(file.name())
    }
}

fn config() -> ConversionConfig {
    let mut config = ConversionConfig::default();
    // Keep rasters small.
    config.render.dpi = 20;
    config
}

fn inputs(names: &[&str]) -> Vec<InputFile> {
    names.iter().map(|n| InputFile::from_bytes(*n, vec![0u8; 16])).collect()
}

/// Raster dimensions of each page's image, in page order.
fn page_rasters(path: &Path) -> Vec<(i64, i64)> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let (_, image_ref) = xobjects.iter().next().unwrap();
            let image = doc
                .get_object(image_ref.as_reference().unwrap())
                .unwrap()
                .as_stream()
                .unwrap();
            (
                image.dict.get(b"Width").unwrap().as_i64().unwrap(),
                image.dict.get(b"Height").unwrap().as_i64().unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_corrupted_middle_file_is_skipped() {
    let decoder = ScriptedDecoder::default()
        .with_image("study/series_a/1.dcm", 10, 40, "DOE^JANE")
        .with_image("study/series_a/3.dcm", 40, 10, "DOE^JANE");
    let converter = BatchConverter::new(decoder, config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let files = inputs(&["study/series_a/1.dcm", "study/series_a/2.dcm", "study/series_a/3.dcm"]);
    let report = converter.run(&files, out.path());

    assert_eq!(report.state, BatchState::Succeeded);
    assert_eq!(report.failure, FailureMask::empty());
    assert_eq!(report.pages_written, 2);
    assert_eq!(report.skipped, vec!["study/series_a/2.dcm".to_string()]);

    let artifact = report.artifact.unwrap();
    assert_eq!(artifact, out.path().join("series_a.pdf"));
    assert!(std::fs::metadata(&artifact).unwrap().len() > 0);

    // Page order follows input order: wide image first, tall image second.
    let rasters = page_rasters(&artifact);
    assert_eq!(rasters.len(), 2);
    assert!(rasters[0].0 > rasters[0].1);
    assert!(rasters[1].0 < rasters[1].1);
}

#[test]
fn test_page_count_matches_decodable_inputs() {
    let decoder = ScriptedDecoder::default()
        .with_image("a/1.dcm", 8, 8, "")
        .with_image("a/2.dcm", 8, 8, "")
        .with_image("a/4.dcm", 8, 8, "");
    let converter = BatchConverter::new(decoder, config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let files = inputs(&["a/1.dcm", "a/2.dcm", "a/3.dcm", "a/4.dcm", "a/5.dcm"]);
    let report = converter.run(&files, out.path());

    assert!(report.is_success());
    assert_eq!(report.pages_written, 3);
    assert_eq!(page_rasters(&report.artifact.unwrap()).len(), 3);
}

#[test]
fn test_empty_batch_fails_without_artifact() {
    let converter = BatchConverter::new(ScriptedDecoder::default(), config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = converter.run(&[], out.path());

    assert_eq!(report.state, BatchState::Failed);
    assert_eq!(
        report.failure,
        FailureMask::CONVERSION_FAILED | FailureMask::ARTIFACT_MISSING
    );
    assert_eq!(report.exit_code(), 3);
    assert!(report.artifact.is_none());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_zero_rendered_pages_is_a_failure() {
    let converter = BatchConverter::new(ScriptedDecoder::default(), config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = converter.run(&inputs(&["x/1.dcm", "x/2.dcm"]), out.path());

    assert_eq!(report.state, BatchState::Failed);
    // The empty document itself was written fine; only the conversion flag is set.
    assert_eq!(report.failure, FailureMask::CONVERSION_FAILED);
    assert_eq!(report.pages_written, 0);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.artifact.is_none());
    assert!(!out.path().join("x.pdf").exists());
}

#[test]
fn test_cancelled_batch_fails() {
    let decoder = ScriptedDecoder::default().with_image("s/1.dcm", 8, 8, "A");
    let converter = BatchConverter::new(decoder, config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let report = converter.run_with(&inputs(&["s/1.dcm"]), out.path(), &token, &mut |_| {});

    assert_eq!(report.state, BatchState::Failed);
    assert!(report.failure.contains(FailureMask::CONVERSION_FAILED));
    assert_eq!(report.pages_written, 0);
}

#[test]
fn test_cancel_between_files_keeps_appended_pages_out() {
    let decoder = ScriptedDecoder::default()
        .with_image("s/1.dcm", 8, 8, "A")
        .with_image("s/2.dcm", 8, 8, "A");
    let converter = BatchConverter::new(decoder, config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let token = CancellationToken::new();
    let cancel = token.clone();
    let report = converter.run_with(&inputs(&["s/1.dcm", "s/2.dcm"]), out.path(), &token, &mut |_| {
        cancel.cancel()
    });

    assert_eq!(report.state, BatchState::Failed);
    assert_eq!(report.pages_written, 1);
    assert!(report.artifact.is_none());
}

#[test]
fn test_progress_events_in_input_order() {
    let decoder = ScriptedDecoder::default()
        .with_image("p/1.dcm", 8, 8, "A")
        .with_image("p/3.dcm", 8, 8, "A");
    let converter = BatchConverter::new(decoder, config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut events = Vec::new();
    let report = converter.run_with(
        &inputs(&["p/1.dcm", "p/2.dcm", "p/3.dcm"]),
        out.path(),
        &CancellationToken::new(),
        &mut |event| events.push(event.clone()),
    );
    assert!(report.is_success());

    let summary: Vec<(usize, String)> = events
        .iter()
        .map(|e| {
            let outcome = match &e.outcome {
                FileOutcome::Appended { page } => format!("page {}", page),
                FileOutcome::Skipped(failure) => format!("skipped {:?}", failure.kind),
            };
            (e.index, outcome)
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, "page 1".to_string()),
            (1, "skipped Parse".to_string()),
            (2, "page 2".to_string()),
        ]
    );
}

#[test]
fn test_configured_file_name_and_nested_output_dir() {
    let decoder = ScriptedDecoder::default().with_image("1.dcm", 8, 8, "A");
    let mut config = config();
    config.output.file_name = Some("report.pdf".to_string());
    let converter = BatchConverter::new(decoder, config).unwrap();
    let out = tempfile::tempdir().unwrap();
    let nested = out.path().join("deliver/here");

    let report = converter.run(&inputs(&["1.dcm"]), &nested);

    assert!(report.is_success());
    assert_eq!(report.artifact.unwrap(), nested.join("report.pdf"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = config();
    config.normalize.contrast_factor = -1.0;
    assert!(BatchConverter::new(ScriptedDecoder::default(), config).is_err());
}

#[test]
fn test_render_error_mid_batch_stops_and_keeps_document_valid() {
    // The middle image has no pixels, which the renderer refuses.
    let decoder = ScriptedDecoder::default()
        .with_image("r/1.dcm", 8, 8, "A")
        .with_image("r/2.dcm", 0, 0, "A")
        .with_image("r/3.dcm", 8, 8, "A");
    let converter = BatchConverter::new(decoder, config()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut events = Vec::new();
    let report = converter.run_with(
        &inputs(&["r/1.dcm", "r/2.dcm", "r/3.dcm"]),
        out.path(),
        &CancellationToken::new(),
        &mut |event| events.push(event.index),
    );

    assert_eq!(report.state, BatchState::Failed);
    // Only the conversion flag: the scratch document was finalized, non-empty.
    assert_eq!(report.failure, FailureMask::CONVERSION_FAILED);
    assert_eq!(report.pages_written, 1);
    assert!(report.skipped.is_empty());
    assert!(report.message.contains("r/2.dcm"), "{}", report.message);
    assert_eq!(events, vec![0]);
    assert!(report.artifact.is_none());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
