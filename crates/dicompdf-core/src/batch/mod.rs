//! Batch driver: decode, normalize, render and append every input in order.

mod report;

pub use report::{BatchReport, BatchState, FailureMask, verify_artifact};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::decode::{ImageDecoder, InputFile};
use crate::error::{ConfigError, DecodeFailure};
use crate::imaging::Normalizer;
use crate::models::config::ConversionConfig;
use crate::models::pixels::{DecodedImage, NormalizedImage};
use crate::pdf::PdfDocumentWriter;
use crate::render::{PageRenderer, caption};

/// Name used when the inputs carry no usable parent directory.
pub const DEFAULT_DOCUMENT_STEM: &str = "dicom";

/// Cooperative cancellation flag, checked once per input.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one input.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Appended as the given 1-based page.
    Appended { page: usize },
    /// Could not be decoded and was skipped.
    Skipped(DecodeFailure),
}

/// Progress notification emitted after each input.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// 0-based position in the input list.
    pub index: usize,
    pub total: usize,
    pub name: String,
    pub outcome: FileOutcome,
}

/// Converts batches of inputs into one PDF each.
pub struct BatchConverter<D> {
    decoder: D,
    normalizer: Normalizer,
    renderer: PageRenderer,
    config: ConversionConfig,
}

/// Result of the assembly loop, before artifact checks.
#[derive(Debug, Default)]
struct Assembly {
    pages: usize,
    skipped: Vec<String>,
    error: Option<String>,
}

impl<D: ImageDecoder> BatchConverter<D> {
    /// Create a converter; the configuration is validated up front.
    pub fn new(decoder: D, config: ConversionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let normalizer = Normalizer::from_config(&config.normalize)?;
        let renderer = PageRenderer::new(config.render.clone())?;
        Ok(Self {
            decoder,
            normalizer,
            renderer,
            config,
        })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert `inputs` and deliver the document into `output_dir`.
    pub fn run(&self, inputs: &[InputFile], output_dir: &Path) -> BatchReport {
        self.run_with(inputs, output_dir, &CancellationToken::new(), &mut |_| {})
    }

    /// Like [`run`](Self::run), with cancellation and per-file progress events.
    pub fn run_with(
        &self,
        inputs: &[InputFile],
        output_dir: &Path,
        cancel: &CancellationToken,
        on_event: &mut dyn FnMut(&FileEvent),
    ) -> BatchReport {
        let mut state = BatchState::Idle;

        if inputs.is_empty() {
            warn!("No input files supplied");
            state = advance(state, BatchState::Failed);
            return failed(
                state,
                FailureMask::CONVERSION_FAILED | FailureMask::ARTIFACT_MISSING,
                Assembly::default(),
                "No input files supplied".to_string(),
            );
        }

        let file_name = self
            .config
            .output
            .file_name
            .clone()
            .unwrap_or_else(|| output_file_name(inputs));

        // Each run writes into its own scratch directory so concurrent
        // batches targeting the same name never share a file.
        let scratch = match tempfile::Builder::new().prefix("dicompdf-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                state = advance(state, BatchState::Failed);
                return failed(
                    state,
                    FailureMask::CONVERSION_FAILED | FailureMask::ARTIFACT_MISSING,
                    Assembly::default(),
                    format!("Failed to create scratch directory: {}", e),
                );
            }
        };
        let scratch_path = scratch.path().join(&file_name);

        state = advance(state, BatchState::Running);
        info!("Converting {} files into {}", inputs.len(), file_name);
        let assembly = self.assemble(inputs, &scratch_path, cancel, on_event);

        let mut mask = verify_artifact(&scratch_path);
        if assembly.error.is_some() || assembly.pages == 0 {
            mask |= FailureMask::CONVERSION_FAILED;
        }

        if !mask.is_empty() {
            state = advance(state, BatchState::Failed);
            let reason = match (&assembly.error, assembly.pages) {
                (Some(error), _) => error.clone(),
                (None, 0) => "no input could be converted".to_string(),
                (None, _) => mask.to_string(),
            };
            let message = format!("Failed to generate PDF: {}", reason);
            return failed(state, mask, assembly, message);
        }

        let target = output_dir.join(&file_name);
        if let Err(e) = deliver(&scratch_path, &target) {
            state = advance(state, BatchState::Failed);
            return failed(
                state,
                FailureMask::CONVERSION_FAILED,
                assembly,
                format!("Failed to write {}: {}", target.display(), e),
            );
        }

        state = advance(state, BatchState::Succeeded);
        info!(
            "Wrote {} pages to {} ({} skipped)",
            assembly.pages,
            target.display(),
            assembly.skipped.len()
        );
        BatchReport {
            state,
            failure: FailureMask::empty(),
            pages_written: assembly.pages,
            message: format!("PDF successfully created at {}", target.display()),
            skipped: assembly.skipped,
            artifact: Some(target),
        }
    }

    /// Decode and normalize a single input, for previews.
    pub fn preview(&self, file: &InputFile) -> Result<NormalizedImage, DecodeFailure> {
        let decoded = self.decoder.decode(file)?;
        Ok(self.normalizer.normalize(&decoded.image))
    }

    fn assemble(
        &self,
        inputs: &[InputFile],
        path: &Path,
        cancel: &CancellationToken,
        on_event: &mut dyn FnMut(&FileEvent),
    ) -> Assembly {
        let mut assembly = Assembly::default();

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut writer = match PdfDocumentWriter::create(path) {
            Ok(writer) => writer.with_title(title),
            Err(e) => {
                assembly.error = Some(format!("cannot open output: {}", e));
                return assembly;
            }
        };

        for (index, file) in inputs.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Conversion cancelled after {} of {} files", index, inputs.len());
                assembly.error = Some("conversion cancelled".to_string());
                break;
            }

            let outcome = match self.decoder.decode(file) {
                Ok(decoded) => {
                    if let Err(e) = self.append(&mut writer, &decoded) {
                        // The writer is still closed below, leaving a valid partial document.
                        assembly.error = Some(format!("{}: {}", file.name(), e));
                        break;
                    }
                    assembly.pages += 1;
                    FileOutcome::Appended {
                        page: assembly.pages,
                    }
                }
                Err(failure) => {
                    warn!("Skipping {}", failure);
                    assembly.skipped.push(file.name().to_string());
                    FileOutcome::Skipped(failure)
                }
            };

            on_event(&FileEvent {
                index,
                total: inputs.len(),
                name: file.name().to_string(),
                outcome,
            });
        }

        if let Err(e) = writer.close() {
            if assembly.error.is_none() {
                assembly.error = Some(format!("cannot finalize document: {}", e));
            }
        }
        assembly
    }

    fn append<W: std::io::Write>(
        &self,
        writer: &mut PdfDocumentWriter<W>,
        decoded: &DecodedImage,
    ) -> crate::Result<()> {
        let normalized = self.normalizer.normalize(&decoded.image);
        let title = caption::page_title(&decoded.metadata);
        let page = self.renderer.render(&normalized, title.as_deref())?;
        writer.append(page)?;
        debug!("Appended page {}", writer.page_count());
        Ok(())
    }
}

/// Document file name derived from the batch: `<parent directory>.pdf`.
///
/// Uses the parent directory of the first input's name, falling back to
/// [`DEFAULT_DOCUMENT_STEM`].
pub fn output_file_name(inputs: &[InputFile]) -> String {
    let stem = inputs
        .first()
        .and_then(|file| Path::new(file.name()).parent().map(Path::to_path_buf))
        .and_then(|parent| parent.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_STEM.to_string());
    format!("{}.pdf", stem)
}

fn advance(from: BatchState, to: BatchState) -> BatchState {
    debug_assert!(from.can_advance_to(to), "illegal transition {:?} -> {:?}", from, to);
    debug!("Batch state {:?} -> {:?}", from, to);
    to
}

fn failed(state: BatchState, failure: FailureMask, assembly: Assembly, message: String) -> BatchReport {
    warn!("{} (failure mask {:#06b})", message, failure.bits());
    BatchReport {
        state,
        failure,
        pages_written: assembly.pages,
        skipped: assembly.skipped,
        artifact: None,
        message,
    }
}

fn deliver(scratch: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::copy(scratch, target)?;
    Ok(())
}
