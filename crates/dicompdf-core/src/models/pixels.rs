//! Pixel grids and descriptive metadata flowing through the pipeline.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A decoded 2-D grid of samples in their original dynamic range.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    samples: Array2<f64>,
}

impl RawImage {
    /// Wrap an existing grid.
    pub fn new(samples: Array2<f64>) -> Self {
        Self { samples }
    }

    /// Build a grid from row-major samples of any numeric type.
    ///
    /// Returns `None` when `data.len() != rows * columns`.
    pub fn from_samples<T>(rows: usize, columns: usize, data: &[T]) -> Option<Self>
    where
        T: Copy + Into<f64>,
    {
        let converted: Vec<f64> = data.iter().map(|&v| v.into()).collect();
        Array2::from_shape_vec((rows, columns), converted)
            .ok()
            .map(Self::new)
    }

    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    pub fn rows(&self) -> usize {
        self.samples.nrows()
    }

    pub fn columns(&self) -> usize {
        self.samples.ncols()
    }
}

/// A grid of intensities in [0, 1], same shape as its source [`RawImage`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    values: Array2<f64>,
}

impl NormalizedImage {
    /// Wrap a grid, clamping every value into [0, 1]. NaN maps to 0.
    pub fn new(mut values: Array2<f64>) -> Self {
        values.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) });
        Self { values }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn columns(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Quantize to 8-bit gray, row-major.
    pub fn to_gray_bytes(&self) -> Vec<u8> {
        self.values
            .iter()
            .map(|&v| (v * 255.0).round() as u8)
            .collect()
    }
}

/// Descriptive fields read from the image header. Absent fields are empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
    pub patient_name: String,
    pub series_description: String,
    pub instance_number: String,
    pub slice_location: String,
    pub study_date: String,
    pub modality: String,
    pub rows: u32,
    pub columns: u32,
}

/// A successfully decoded input.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: RawImage,
    pub metadata: ImageMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_samples_checks_shape() {
        let raw = RawImage::from_samples(2, 3, &[1u16, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(raw.rows(), 2);
        assert_eq!(raw.columns(), 3);
        assert_eq!(raw.samples()[[1, 0]], 4.0);

        assert!(RawImage::from_samples(2, 2, &[1i16, 2, 3]).is_none());
    }

    #[test]
    fn test_normalized_image_clamps() {
        let norm = NormalizedImage::new(array![[-0.5, 0.25], [1.5, f64::NAN]]);
        assert_eq!(norm.values(), &array![[0.0, 0.25], [1.0, 0.0]]);
    }

    #[test]
    fn test_gray_bytes() {
        let norm = NormalizedImage::new(array![[0.0, 0.5, 1.0]]);
        assert_eq!(norm.to_gray_bytes(), vec![0, 128, 255]);
    }
}
