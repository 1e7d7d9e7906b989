use crate::primitives::{FontWeight, TextStyle};

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

/// Approximate text extent in points for a sans-serif face.
///
/// No font file is embedded, so widths use an average advance per glyph.
pub fn measure_text(text: &str, style: &TextStyle) -> TextMetrics {
    let advance = match style.weight {
        FontWeight::Regular => 0.55,
        FontWeight::Bold => 0.60,
    };
    let n = text.chars().count() as f64;
    TextMetrics {
        width: n * advance * style.size,
        height: 1.2 * style.size,
        ascent: 0.9 * style.size,
    }
}
