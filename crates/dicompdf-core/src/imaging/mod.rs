//! Intensity normalization of decoded pixel grids.

mod normalize;

pub use normalize::{Normalizer, normalize_image, percentile};
