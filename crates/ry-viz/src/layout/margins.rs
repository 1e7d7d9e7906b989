use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::primitives::TextStyle;

/// Frame of the data region, in canvas points.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

const OUTER: f64 = 15.0;
const GAP: f64 = 6.0;
const MIN_SIDE: f64 = 50.0;

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Largest frame leaving room for tick labels, axis titles and the
    /// header line.
    pub fn fit(canvas: &Canvas, x_axis: &Axis, y_axis: &Axis, config: &VizConfig) -> Self {
        let tick = TextStyle::sized(config.font.tick_size);
        let title = config.font.label_size;
        let widest_tick = y_axis
            .ticks
            .iter()
            .map(|t| canvas.measure_text(&t.label, &tick).width)
            .fold(0.0, f64::max);

        let title_room = |label: &str| if label.is_empty() { 0.0 } else { title + GAP };
        let left = OUTER + widest_tick + 8.0 + title_room(&y_axis.label);
        let bottom = OUTER + tick.size + GAP + title_room(&x_axis.label);
        let top = 1.3 * title + 20.0;

        Self {
            left,
            top,
            width: (canvas.width - left - OUTER).max(MIN_SIDE),
            height: (canvas.height - top - bottom).max(MIN_SIDE),
        }
    }
}
