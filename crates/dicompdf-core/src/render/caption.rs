//! Page titles derived from image metadata.

use crate::models::pixels::ImageMetadata;

/// Separator between the patient name and the series description.
pub const TITLE_SEPARATOR: &str = " | ";

/// Helvetica advance widths for printable ASCII (32..=126), in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

/// Turn a DICOM person-name style value into display text.
///
/// `^` and `_` become spaces, whitespace runs collapse, ends are trimmed.
pub fn clean_name(value: &str) -> String {
    value
        .replace(['^', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the page title: patient name, then series description.
///
/// Empty parts are dropped, so a title without a patient name is the series
/// description alone. Returns `None` when nothing is left.
pub fn page_title(metadata: &ImageMetadata) -> Option<String> {
    let parts: Vec<String> = [&metadata.patient_name, &metadata.series_description]
        .into_iter()
        .map(|part| clean_name(part))
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(TITLE_SEPARATOR))
    }
}

/// Restrict text to what a standard PDF font with WinAnsi encoding can show.
///
/// Control characters are dropped, characters beyond Latin-1 become `?`.
pub fn sanitize_for_standard_font(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| if (c as u32) <= 0xFF { c } else { '?' })
        .collect()
}

/// Approximate rendered width of `text` in Helvetica at `font_size` points.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                HELVETICA_WIDTHS[(code - 32) as usize] as u32
            } else {
                DEFAULT_WIDTH as u32
            }
        })
        .sum();
    units as f64 * font_size / 1000.0
}
