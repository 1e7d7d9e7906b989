use crate::canvas::Canvas;
use crate::color::Color;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    pub kind: LegendKind,
}

impl LegendEntry {
    pub fn line(label: &str, color: Color) -> Self {
        Self { label: label.into(), color, kind: LegendKind::Line { dashed: false } }
    }

    pub fn dashed(label: &str, color: Color) -> Self {
        Self { label: label.into(), color, kind: LegendKind::Line { dashed: true } }
    }

    pub fn marker(label: &str, color: Color) -> Self {
        Self { label: label.into(), color, kind: LegendKind::Marker }
    }
}

pub enum LegendKind {
    Line { dashed: bool },
    Marker,
}

const SWATCH: f64 = 14.0;
const PAD: f64 = 6.0;

/// Boxed legend in the top-right corner of the frame, one row per entry.
pub fn draw_legend(canvas: &mut Canvas, area: &PlotArea, entries: &[LegendEntry], font_size: f64) {
    if entries.is_empty() {
        return;
    }
    let text = TextStyle::sized(0.85 * font_size).baseline(TextBaseline::Central);
    let row = font_size + 4.0;
    let label_w = entries
        .iter()
        .map(|e| canvas.measure_text(&e.label, &text).width)
        .fold(0.0, f64::max);

    let (w, h) = (SWATCH + label_w + 3.0 * PAD, entries.len() as f64 * row + 2.0 * PAD);
    let (x0, y0) = (area.right() - w - 5.0, area.top + 5.0);
    canvas.rect(x0, y0, w, h, &Style::filled(Color::rgb(255, 255, 255).with_alpha(0.9)));

    for (i, entry) in entries.iter().enumerate() {
        let y = y0 + PAD + (i as f64 + 0.5) * row;
        let x = x0 + PAD;
        match entry.kind {
            LegendKind::Line { dashed: false } => {
                canvas.line(x, y, x + SWATCH, y, &LineStyle::solid(entry.color, 1.5))
            }
            LegendKind::Line { dashed: true } => {
                canvas.line(x, y, x + SWATCH, y, &LineStyle::dashed(entry.color, 1.5))
            }
            LegendKind::Marker => canvas.marker(x + SWATCH / 2.0, y, &MarkerStyle::new(entry.color)),
        }
        canvas.text(x + SWATCH + PAD, y, &entry.label, &text);
    }
}
