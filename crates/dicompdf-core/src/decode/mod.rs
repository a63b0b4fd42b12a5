//! Decoder adapter: turns an input file into a raw pixel grid plus metadata.

mod dicom;

pub use dicom::DicomDecoder;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::DecodeFailure;
use crate::models::pixels::DecodedImage;

/// Where the bytes of an input come from.
#[derive(Debug, Clone)]
enum InputSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

/// One input of a batch: a name and a readable byte source.
///
/// Path-backed inputs are read lazily, when the decoder asks for their bytes.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    source: InputSource,
}

impl InputFile {
    /// An input held in memory, e.g. an upload.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Memory(data),
        }
    }

    /// An input backed by a file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.to_string_lossy().into_owned(),
            source: InputSource::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased extension of the name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Read the full byte content.
    pub fn bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match &self.source {
            InputSource::Memory(data) => Ok(Cow::Borrowed(data)),
            InputSource::Path(path) => std::fs::read(path).map(Cow::Owned),
        }
    }
}

/// Decoding capability consumed by the batch driver.
///
/// Implementations must collapse every parse problem into a [`DecodeFailure`];
/// the driver treats it as "skip this input".
pub trait ImageDecoder {
    /// Decode pixels and metadata.
    fn decode(&self, file: &InputFile) -> Result<DecodedImage, DecodeFailure>;

    /// Cheap validity check without decoding pixels.
    fn probe(&self, file: &InputFile) -> bool;
}

impl<D: ImageDecoder + ?Sized> ImageDecoder for &D {
    fn decode(&self, file: &InputFile) -> Result<DecodedImage, DecodeFailure> {
        (**self).decode(file)
    }

    fn probe(&self, file: &InputFile) -> bool {
        (**self).probe(file)
    }
}
