//! Page rendering: lays out one normalized image and its title on a square page.

pub mod caption;

use image::imageops::{self, FilterType};
use image::GrayImage;
use tracing::debug;

use crate::error::{ConfigError, RenderError};
use crate::models::config::RenderConfig;
use crate::models::pixels::NormalizedImage;

/// PDF user space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Axis-aligned rectangle in points, origin at the bottom-left of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// White title text drawn above the image.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTitle {
    /// Text restricted to the standard font character range.
    pub text: String,
    /// Baseline start, in points.
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

/// A fully laid out page, ready to be appended to a document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Side of the square page in points.
    pub size: f64,
    /// Grayscale raster of the image plane at the configured DPI.
    pub raster: GrayImage,
    /// Where the raster is drawn.
    pub placement: Rect,
    pub title: Option<PageTitle>,
}

/// Renders normalized images onto fixed-size black pages.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    config: RenderConfig,
}

impl PageRenderer {
    /// Create a renderer, rejecting geometry that leaves no room for an image.
    pub fn new(config: RenderConfig) -> Result<Self, ConfigError> {
        if config.dpi == 0 {
            return Err(ConfigError::InvalidDpi);
        }
        if !(config.page_size_in > 0.0) || !(config.margin_in >= 0.0) || config.margin_in * 2.0 >= config.page_size_in {
            return Err(ConfigError::InvalidGeometry(format!(
                "page {}in with margin {}in",
                config.page_size_in, config.margin_in
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Side of the page in points.
    pub fn page_size(&self) -> f64 {
        self.config.page_size_in * POINTS_PER_INCH
    }

    /// Lay out `image` and an optional title on one page.
    ///
    /// An empty or whitespace-only title is omitted.
    pub fn render(&self, image: &NormalizedImage, title: Option<&str>) -> Result<Page, RenderError> {
        if image.is_empty() {
            return Err(RenderError::EmptyImage {
                rows: image.rows(),
                columns: image.columns(),
            });
        }

        let size = self.page_size();
        let margin = self.config.margin_in * POINTS_PER_INCH;
        let title = title
            .map(caption::sanitize_for_standard_font)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|text| self.layout_title(text, size, margin));

        let top = match &title {
            Some(t) => (t.y - t.font_size * 0.5).min(size - margin),
            None => size - margin,
        };
        let area = Rect {
            x: margin,
            y: margin,
            width: size - 2.0 * margin,
            height: (top - margin).max(1.0),
        };
        let placement = fit(area, image.columns(), image.rows());
        let raster = self.rasterize(image, placement)?;

        debug!(
            "Rendered {}x{} image into {}x{} px at ({:.1}, {:.1}) pt",
            image.columns(),
            image.rows(),
            raster.width(),
            raster.height(),
            placement.x,
            placement.y
        );

        Ok(Page {
            size,
            raster,
            placement,
            title,
        })
    }

    fn layout_title(&self, text: String, size: f64, margin: f64) -> PageTitle {
        let font_size = self.config.title_font_size;
        let width = caption::text_width(&text, font_size);
        let x = ((size - width) / 2.0).max(margin);
        let y = (size * self.config.title_position).min(size - margin - font_size * 0.8);
        PageTitle {
            text,
            x,
            y,
            font_size,
        }
    }

    /// Convert the grid to 8-bit gray and resample it to the placement at the configured DPI.
    fn rasterize(&self, image: &NormalizedImage, placement: Rect) -> Result<GrayImage, RenderError> {
        let (columns, rows) = (image.columns() as u32, image.rows() as u32);
        let gray = GrayImage::from_raw(columns, rows, image.to_gray_bytes()).ok_or_else(|| {
            RenderError::Raster(format!("buffer does not match {}x{}", columns, rows))
        })?;

        let dpi = self.config.dpi as f64;
        let target_width = ((placement.width / POINTS_PER_INCH) * dpi).round().max(1.0) as u32;
        let target_height = ((placement.height / POINTS_PER_INCH) * dpi).round().max(1.0) as u32;

        if (target_width, target_height) == (columns, rows) {
            return Ok(gray);
        }
        Ok(imageops::resize(&gray, target_width, target_height, FilterType::Triangle))
    }
}

/// Largest rectangle with the image's aspect ratio centred inside `area`.
fn fit(area: Rect, columns: usize, rows: usize) -> Rect {
    let scale = (area.width / columns as f64).min(area.height / rows as f64);
    let width = columns as f64 * scale;
    let height = rows as f64 * scale;
    Rect {
        x: area.x + (area.width - width) / 2.0,
        y: area.y + (area.height - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn renderer(dpi: u32) -> PageRenderer {
        PageRenderer::new(RenderConfig {
            dpi,
            ..RenderConfig::default()
        })
        .unwrap()
    }

    fn gradient(rows: usize, columns: usize) -> NormalizedImage {
        let values = Array2::from_shape_fn((rows, columns), |(_, c)| c as f64 / (columns - 1) as f64);
        NormalizedImage::new(values)
    }

    #[test]
    fn test_square_image_without_title() {
        let page = renderer(100).render(&gradient(64, 64), None).unwrap();

        assert_eq!(page.size, 720.0);
        assert!(page.title.is_none());
        let p = page.placement;
        assert!((p.x - 7.2).abs() < 1e-9);
        assert!((p.width - 705.6).abs() < 1e-9);
        assert!((p.height - 705.6).abs() < 1e-9);
        // 9.8 inches at 100 DPI
        assert_eq!((page.raster.width(), page.raster.height()), (980, 980));
    }

    #[test]
    fn test_raster_keeps_value_range() {
        let page = renderer(50).render(&gradient(16, 256), None).unwrap();
        let pixels: Vec<u8> = page.raster.pixels().map(|p| p.0[0]).collect();
        assert!(*pixels.iter().min().unwrap() <= 2);
        assert!(*pixels.iter().max().unwrap() >= 253);
    }

    #[test]
    fn test_wide_image_keeps_aspect() {
        let page = renderer(100).render(&gradient(100, 200), None).unwrap();
        let p = page.placement;
        assert!((p.width / p.height - 2.0).abs() < 1e-9);
        assert!((p.y + p.height / 2.0 - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_title_is_centered_above_image() {
        let page = renderer(72).render(&gradient(32, 32), Some("DOE JANE | CT HEAD")).unwrap();
        let title = page.title.unwrap();

        assert_eq!(title.text, "DOE JANE | CT HEAD");
        assert!((title.y - 684.0).abs() < 1e-9);
        let width = caption::text_width(&title.text, title.font_size);
        assert!((title.x + width / 2.0 - 360.0).abs() < 1e-9);
        assert!(page.placement.y + page.placement.height <= title.y);
    }

    #[test]
    fn test_blank_title_is_omitted() {
        let page = renderer(72).render(&gradient(8, 8), Some("   ")).unwrap();
        assert!(page.title.is_none());
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let empty = NormalizedImage::new(Array2::zeros((0, 4)));
        let err = renderer(72).render(&empty, None).unwrap_err();
        assert!(matches!(err, RenderError::EmptyImage { rows: 0, columns: 4 }));
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let config = RenderConfig {
            margin_in: 5.0,
            ..RenderConfig::default()
        };
        assert!(PageRenderer::new(config).is_err());
        assert!(PageRenderer::new(RenderConfig { dpi: 0, ..RenderConfig::default() }).is_err());
    }
}
