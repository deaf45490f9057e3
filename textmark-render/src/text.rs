//! Conversion from PDFium text segments to the text content description.

use textmark_core::{TextItem, TextStyle};

/// Style key used when a segment's font could not be resolved.
pub const DEFAULT_FONT_KEY: &str = "default";

/// Maps a PDF font name to a generic family the overlay can use.
pub fn font_family_for(font_name: &str) -> &'static str {
    let lower = font_name.to_ascii_lowercase();
    // Subset prefixes look like "ABCDEF+Times-Roman".
    let base = lower.split_once('+').map_or(lower.as_str(), |(_, rest)| rest);
    if base.contains("courier") || base.contains("mono") || base.contains("consol") {
        "monospace"
    } else if base.contains("sans") || base.contains("arial") || base.contains("helvetica") {
        "sans-serif"
    } else if base.contains("times") || base.contains("serif") || base.contains("georgia") {
        "serif"
    } else {
        "sans-serif"
    }
}

pub fn style_for_font(font_name: &str) -> TextStyle {
    TextStyle::family(font_family_for(font_name))
}

/// Bounds are in page points with a bottom-left origin. The segment
/// height stands in for the font size.
pub fn segment_to_item(
    text: String,
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
    font_name: Option<String>,
) -> TextItem {
    let height = (top - bottom).abs();
    TextItem {
        text,
        transform: [height, 0.0, 0.0, height, left, bottom.min(top)],
        font_name: font_name.unwrap_or_else(|| DEFAULT_FONT_KEY.to_string()),
        width: (right - left).abs(),
        height,
    }
}
