//! Configuration structures for the conversion pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::ConfigError;

/// Contrast range the conversion is tuned for.
pub const RECOMMENDED_CONTRAST: (f64, f64) = (0.5, 1.5);

/// DPI range the conversion is tuned for.
pub const RECOMMENDED_DPI: (u32, u32) = (100, 300);

/// Main configuration for a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionConfig {
    /// Intensity normalization.
    pub normalize: NormalizeConfig,

    /// Page rendering.
    pub render: RenderConfig,

    /// Input discovery.
    pub input: InputConfig,

    /// Output naming.
    pub output: OutputConfig,

    /// Preview sampling.
    pub preview: PreviewConfig,
}

/// Normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Gamma exponent applied after rescaling. Below 1 brightens midtones.
    pub contrast_factor: f64,

    /// Lower clipping percentile (0 - 100).
    pub lower_percentile: f64,

    /// Upper clipping percentile (0 - 100).
    pub upper_percentile: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            contrast_factor: 0.9,
            lower_percentile: 2.0,
            upper_percentile: 98.0,
        }
    }
}

/// Page rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Raster resolution of the image plane.
    pub dpi: u32,

    /// Side of the square page in inches.
    pub page_size_in: f64,

    /// Uniform margin in inches.
    pub margin_in: f64,

    /// Title font size in points.
    pub title_font_size: f64,

    /// Title baseline as a fraction of page height, measured from the bottom.
    pub title_position: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            page_size_in: 10.0,
            margin_in: 0.1,
            title_font_size: 12.0,
            title_position: 0.95,
        }
    }
}

/// Input discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Accepted file extensions, lowercase without the leading dot.
    pub extensions: Vec<String>,

    /// Attempt files without an extension if they pass the DICOM probe.
    pub probe_unrecognized: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["dcm".to_string(), "dicom".to_string(), "dic".to_string()],
            probe_unrecognized: true,
        }
    }
}

impl InputConfig {
    /// Whether `extension` is on the allow-list (case-insensitive, leading dot optional).
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.');
        self.extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Output naming configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Fixed document name; derived from the input grouping when unset.
    pub file_name: Option<String>,
}

/// Preview configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Maximum number of sampled inputs.
    pub sample_size: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { sample_size: 10 }
    }
}

impl ConversionConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Reject values the pipeline cannot work with.
    ///
    /// Values that are usable but outside the tuned ranges only produce a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.normalize;
        if !n.contrast_factor.is_finite() || n.contrast_factor <= 0.0 {
            return Err(ConfigError::InvalidContrast(n.contrast_factor));
        }
        if !(0.0..=100.0).contains(&n.lower_percentile)
            || !(0.0..=100.0).contains(&n.upper_percentile)
            || n.lower_percentile >= n.upper_percentile
        {
            return Err(ConfigError::InvalidPercentiles {
                lower: n.lower_percentile,
                upper: n.upper_percentile,
            });
        }

        let r = &self.render;
        if r.dpi == 0 {
            return Err(ConfigError::InvalidDpi);
        }
        if !(r.page_size_in > 0.0) || !(r.margin_in >= 0.0) || r.margin_in * 2.0 >= r.page_size_in {
            return Err(ConfigError::InvalidGeometry(format!(
                "page {}in with margin {}in",
                r.page_size_in, r.margin_in
            )));
        }
        if !(r.title_font_size > 0.0) || !(0.0..=1.0).contains(&r.title_position) {
            return Err(ConfigError::InvalidGeometry(format!(
                "title font {}pt at {}",
                r.title_font_size, r.title_position
            )));
        }

        let (lo, hi) = RECOMMENDED_CONTRAST;
        if n.contrast_factor < lo || n.contrast_factor > hi {
            warn!("Contrast factor {} is outside the recommended range {}-{}", n.contrast_factor, lo, hi);
        }
        let (lo, hi) = RECOMMENDED_DPI;
        if r.dpi < lo || r.dpi > hi {
            warn!("DPI {} is outside the recommended range {}-{}", r.dpi, lo, hi);
        }

        Ok(())
    }
}
