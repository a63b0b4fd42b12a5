//! Error types for the dicompdf-core library.

use thiserror::Error;

/// Main error type for the dicompdf library.
#[derive(Error, Debug)]
pub enum DicomPdfError {
    /// A single input could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeFailure),

    /// Page rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// PDF assembly error.
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a file could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailureKind {
    /// The byte stream is not a readable DICOM object.
    Parse,
    /// The object carries no pixel data.
    MissingPixelData,
    /// The pixel data uses an encoding we cannot decode.
    UnsupportedEncoding,
    /// The decoded samples do not match the declared dimensions.
    InvalidShape,
}

/// Per-file decode outcome. Recoverable: the batch skips the file and continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot decode '{name}': {reason}")]
pub struct DecodeFailure {
    /// Name of the input that failed.
    pub name: String,
    /// Failure category.
    pub kind: DecodeFailureKind,
    /// Human readable detail from the underlying decoder.
    pub reason: String,
}

impl DecodeFailure {
    pub fn new(name: impl Into<String>, kind: DecodeFailureKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            reason: reason.into(),
        }
    }
}

/// Errors related to page rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The normalized grid has no samples.
    #[error("image has no pixels ({rows}x{columns})")]
    EmptyImage { rows: usize, columns: usize },

    /// Failed to build the raster buffer.
    #[error("failed to build raster: {0}")]
    Raster(String),
}

/// Errors related to writing the PDF document.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// PDF object model error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Failed to write the document to its sink.
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),

    /// The writer was already finalized.
    #[error("document already closed")]
    Closed,
}

/// Errors related to configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Contrast exponent must be a positive finite number.
    #[error("contrast factor must be positive and finite, got {0}")]
    InvalidContrast(f64),

    /// Percentile bounds must satisfy 0 <= lower < upper <= 100.
    #[error("invalid percentile bounds: lower={lower}, upper={upper}")]
    InvalidPercentiles { lower: f64, upper: f64 },

    /// DPI must be non-zero.
    #[error("DPI must be greater than zero")]
    InvalidDpi,

    /// Page geometry leaves no room for the image.
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// Failed to read or parse a configuration file.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Result type for the dicompdf library.
pub type Result<T> = std::result::Result<T, DicomPdfError>;
