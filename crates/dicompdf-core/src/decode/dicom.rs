//! DICOM decoding using dicom-object and dicom-pixeldata.

use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTable;
use dicom_object::{DefaultDicomObject, Tag};
use dicom_pixeldata::PixelDecoder;
use tracing::{debug, trace};

use super::{ImageDecoder, InputFile};
use crate::error::{DecodeFailure, DecodeFailureKind};
use crate::models::pixels::{DecodedImage, ImageMetadata, RawImage};

/// Length of the file preamble preceding the `DICM` magic code.
const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Decoder for DICOM Part 10 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomDecoder;

impl DicomDecoder {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, file: &InputFile) -> Result<DefaultDicomObject, DecodeFailure> {
        let bytes = file
            .bytes()
            .map_err(|e| DecodeFailure::new(file.name(), DecodeFailureKind::Parse, e.to_string()))?;
        let body = dicom_body(&bytes).ok_or_else(|| {
            DecodeFailure::new(file.name(), DecodeFailureKind::Parse, "missing DICM magic code")
        })?;

        dicom_object::from_reader(body)
            .map_err(|e| DecodeFailure::new(file.name(), DecodeFailureKind::Parse, e.to_string()))
    }

    fn pixels(&self, name: &str, obj: &DefaultDicomObject) -> Result<RawImage, DecodeFailure> {
        if obj.element(tags::PIXEL_DATA).is_err() {
            return Err(DecodeFailure::new(
                name,
                DecodeFailureKind::MissingPixelData,
                "no PixelData element",
            ));
        }

        let decoded = obj.decode_pixel_data().map_err(|e| {
            DecodeFailure::new(name, DecodeFailureKind::UnsupportedEncoding, e.to_string())
        })?;

        let rows = decoded.rows() as usize;
        let columns = decoded.columns() as usize;
        let samples_per_pixel = decoded.samples_per_pixel().max(1) as usize;
        trace!(
            "Pixel data for {}: {}x{}, {} samples/pixel, {} frames",
            name,
            rows,
            columns,
            samples_per_pixel,
            decoded.number_of_frames()
        );
        if rows == 0 || columns == 0 {
            return Err(DecodeFailure::new(
                name,
                DecodeFailureKind::InvalidShape,
                format!("image has no pixels ({}x{})", rows, columns),
            ));
        }

        // Only the first frame of multi-frame objects is rendered.
        let samples: Vec<f64> = decoded.to_vec_frame::<f64>(0).map_err(|e| {
            DecodeFailure::new(name, DecodeFailureKind::UnsupportedEncoding, e.to_string())
        })?;

        let intensities = collapse_samples(&samples, samples_per_pixel);
        RawImage::from_samples(rows, columns, &intensities).ok_or_else(|| {
            DecodeFailure::new(
                name,
                DecodeFailureKind::InvalidShape,
                format!(
                    "{} samples do not fill {}x{}",
                    intensities.len(),
                    rows,
                    columns
                ),
            )
        })
    }
}

impl ImageDecoder for DicomDecoder {
    fn decode(&self, file: &InputFile) -> Result<DecodedImage, DecodeFailure> {
        let obj = self.open(file)?;
        let metadata = read_metadata(&obj);
        let image = self.pixels(file.name(), &obj)?;

        debug!(
            "Decoded {} ({}x{}, modality '{}')",
            file.name(),
            image.rows(),
            image.columns(),
            metadata.modality
        );

        Ok(DecodedImage { image, metadata })
    }

    fn probe(&self, file: &InputFile) -> bool {
        let Ok(bytes) = file.bytes() else {
            return false;
        };
        match dicom_body(&bytes) {
            Some(body) => FileMetaTable::from_reader(body).is_ok(),
            None => false,
        }
    }
}

/// Slice the byte stream so it starts at the `DICM` magic code.
fn dicom_body(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() >= PREAMBLE_LEN + MAGIC.len() && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC {
        Some(&bytes[PREAMBLE_LEN..])
    } else if bytes.starts_with(MAGIC) {
        Some(bytes)
    } else {
        None
    }
}

/// Average interleaved samples of each pixel into a single intensity.
fn collapse_samples(samples: &[f64], samples_per_pixel: usize) -> Vec<f64> {
    if samples_per_pixel <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(samples_per_pixel)
        .map(|px| px.iter().sum::<f64>() / samples_per_pixel as f64)
        .collect()
}

fn read_metadata(obj: &DefaultDicomObject) -> ImageMetadata {
    ImageMetadata {
        patient_name: string_tag(obj, tags::PATIENT_NAME),
        series_description: string_tag(obj, tags::SERIES_DESCRIPTION),
        instance_number: string_tag(obj, tags::INSTANCE_NUMBER),
        slice_location: string_tag(obj, tags::SLICE_LOCATION),
        study_date: string_tag(obj, tags::STUDY_DATE),
        modality: string_tag(obj, tags::MODALITY),
        rows: u32_tag(obj, tags::ROWS),
        columns: u32_tag(obj, tags::COLUMNS),
    }
}

fn string_tag(obj: &DefaultDicomObject, tag: Tag) -> String {
    obj.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string())
        .unwrap_or_default()
}

fn u32_tag(obj: &DefaultDicomObject, tag: Tag) -> u32 {
    obj.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<u32>().ok())
        .unwrap_or(0)
}
