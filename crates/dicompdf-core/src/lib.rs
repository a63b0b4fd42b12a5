//! Core library for converting DICOM series into PDF documents.
//!
//! This crate provides:
//! - DICOM decoding into raw pixel grids and metadata
//! - Intensity normalization (percentile clipping, rescaling, gamma)
//! - Page rendering with captions derived from metadata
//! - Incremental PDF assembly and a batch driver with failure reporting

pub mod batch;
pub mod decode;
pub mod error;
pub mod imaging;
pub mod models;
pub mod pdf;
pub mod render;

pub use batch::{BatchConverter, BatchReport, BatchState, CancellationToken, FailureMask, FileEvent, FileOutcome};
pub use decode::{DicomDecoder, ImageDecoder, InputFile};
pub use error::{DecodeFailure, DecodeFailureKind, DicomPdfError, Result};
pub use imaging::{Normalizer, normalize_image};
pub use models::config::ConversionConfig;
pub use models::pixels::{DecodedImage, ImageMetadata, NormalizedImage, RawImage};
pub use pdf::PdfDocumentWriter;
pub use render::{Page, PageRenderer};
