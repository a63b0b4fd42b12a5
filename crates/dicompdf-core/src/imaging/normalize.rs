//! Percentile clipping, linear rescaling and gamma correction.

use ndarray::Array2;
use tracing::trace;

use crate::error::ConfigError;
use crate::models::config::NormalizeConfig;
use crate::models::pixels::{NormalizedImage, RawImage};

/// Maps a raw pixel grid of arbitrary range into display intensities in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    lower_percentile: f64,
    upper_percentile: f64,
    contrast: f64,
}

impl Normalizer {
    /// Create a normalizer with 2nd/98th percentile clipping.
    pub fn new(contrast: f64) -> Result<Self, ConfigError> {
        if !contrast.is_finite() || contrast <= 0.0 {
            return Err(ConfigError::InvalidContrast(contrast));
        }
        Ok(Self {
            lower_percentile: 2.0,
            upper_percentile: 98.0,
            contrast,
        })
    }

    /// Create a normalizer from configuration.
    pub fn from_config(config: &NormalizeConfig) -> Result<Self, ConfigError> {
        Self::new(config.contrast_factor)?
            .with_percentiles(config.lower_percentile, config.upper_percentile)
    }

    /// Set the clipping percentiles.
    pub fn with_percentiles(mut self, lower: f64, upper: f64) -> Result<Self, ConfigError> {
        if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
            return Err(ConfigError::InvalidPercentiles { lower, upper });
        }
        self.lower_percentile = lower;
        self.upper_percentile = upper;
        Ok(self)
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    /// Normalize a raw grid.
    ///
    /// A grid that is flat after clipping becomes all zeros. Non-finite
    /// samples are ignored when estimating the percentiles and end up as 0.
    pub fn normalize(&self, raw: &RawImage) -> NormalizedImage {
        let samples = raw.samples();

        let mut finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return NormalizedImage::new(Array2::zeros(samples.raw_dim()));
        }
        finite.sort_by(f64::total_cmp);

        let low = percentile_sorted(&finite, self.lower_percentile);
        let high = percentile_sorted(&finite, self.upper_percentile);

        // After clipping, the extrema are the clip bounds unless every sample
        // lies strictly inside them.
        let min = finite[0].clamp(low, high);
        let max = finite[finite.len() - 1].clamp(low, high);
        trace!("Clip bounds [{}, {}], clipped range [{}, {}]", low, high, min, max);

        if max <= min {
            return NormalizedImage::new(Array2::zeros(samples.raw_dim()));
        }

        let span = max - min;
        let gamma = self.contrast;
        let values = samples.mapv(|v| {
            if !v.is_finite() {
                return 0.0;
            }
            let scaled = (v.clamp(low, high) - min) / span;
            scaled.powf(gamma)
        });

        NormalizedImage::new(values)
    }
}

/// Normalize `raw` with the default clipping percentiles.
pub fn normalize_image(raw: &RawImage, contrast: f64) -> Result<NormalizedImage, ConfigError> {
    Ok(Normalizer::new(contrast)?.normalize(raw))
}

/// Percentile of `values` using linear interpolation between closest ranks.
///
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(percentile_sorted(&sorted, p))
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
