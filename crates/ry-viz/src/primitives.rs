use std::fmt;

use crate::color::Color;

const BLACK: Color = Color::rgb(0, 0, 0);

/// Dash pattern of background curves.
pub const DASHED: &str = "6 3";

/// Fill and stroke of closed shapes.
#[derive(Debug, Clone)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { fill: None, stroke: None, stroke_width: 1.0, opacity: 1.0 }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self { fill: Some(color), ..Self::default() }
    }
}

#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    pub dash: Option<String>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::solid(BLACK, 1.0)
    }
}

impl LineStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: None }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self { dash: Some(DASHED.into()), ..Self::solid(color, width) }
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub weight: FontWeight,
    pub anchor: TextAnchor,
    pub baseline: TextBaseline,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::sized(10.0)
    }
}

impl TextStyle {
    /// Black, regular, start-anchored text of `size` points.
    pub fn sized(size: f64) -> Self {
        Self {
            size,
            color: BLACK,
            weight: FontWeight::Regular,
            anchor: TextAnchor::Start,
            baseline: TextBaseline::Alphabetic,
        }
    }

    pub fn anchor(self, anchor: TextAnchor) -> Self {
        Self { anchor, ..self }
    }

    pub fn baseline(self, baseline: TextBaseline) -> Self {
        Self { baseline, ..self }
    }

    pub fn color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    pub fn bold(self) -> Self {
        Self { weight: FontWeight::Bold, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// SVG `text-anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl fmt::Display for TextAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        })
    }
}

/// SVG `dominant-baseline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Alphabetic,
    Central,
    Hanging,
}

impl fmt::Display for TextBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alphabetic => "auto",
            Self::Central => "central",
            Self::Hanging => "hanging",
        })
    }
}

/// Filled circle marking a data point.
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    pub radius: f64,
    pub color: Color,
}

impl MarkerStyle {
    pub fn new(color: Color) -> Self {
        Self { radius: 2.5, color }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_other_fields() {
        let s = TextStyle::sized(8.5).anchor(TextAnchor::End).bold();
        assert_eq!(s.size, 8.5);
        assert_eq!(s.anchor, TextAnchor::End);
        assert_eq!(s.baseline, TextBaseline::Alphabetic);
        assert_eq!(s.weight, FontWeight::Bold);
    }

    #[test]
    fn attribute_values() {
        assert_eq!(TextAnchor::Middle.to_string(), "middle");
        assert_eq!(TextBaseline::Alphabetic.to_string(), "auto");
        assert_eq!(LineStyle::dashed(BLACK, 1.0).dash.as_deref(), Some("6 3"));
    }
}
