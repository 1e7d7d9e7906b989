use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Bottom,
    Top,
    Left,
    Right,
}

impl Side {
    /// Unit vector pointing into the frame.
    fn inward(self) -> (f64, f64) {
        match self {
            Side::Bottom => (0.0, -1.0),
            Side::Top => (0.0, 1.0),
            Side::Left => (1.0, 0.0),
            Side::Right => (-1.0, 0.0),
        }
    }

    /// Point on this side of the frame at coordinate `at` along it.
    fn anchor(self, area: &PlotArea, at: f64) -> (f64, f64) {
        match self {
            Side::Bottom => (at, area.bottom()),
            Side::Top => (at, area.top),
            Side::Left => (area.left, at),
            Side::Right => (area.right(), at),
        }
    }
}

/// Ticks, tick labels and titles around a boxed frame.
struct AxesPainter<'a> {
    area: &'a PlotArea,
    config: &'a VizConfig,
    /// +1 for ticks drawn into the frame, -1 for outward ticks.
    direction: f64,
}

impl AxesPainter<'_> {
    fn tick(&self, canvas: &mut Canvas, side: Side, at: f64, length: f64, style: &LineStyle) {
        let (x, y) = side.anchor(self.area, at);
        let (dx, dy) = side.inward();
        let l = self.direction * length;
        canvas.line(x, y, x + dx * l, y + dy * l, style);
    }

    /// Extra distance of labels from the frame when ticks point outwards.
    fn label_offset(&self) -> f64 {
        if self.direction > 0.0 { 0.0 } else { self.config.axes.tick_length }
    }

    fn visible(lo: f64, hi: f64, px: f64) -> bool {
        px >= lo.min(hi) - 0.5 && px <= lo.max(hi) + 0.5
    }
}

/// Draw the frame, major and minor ticks, tick labels, optional grid and
/// the axis titles.
pub fn draw_axes(canvas: &mut Canvas, area: &PlotArea, x_axis: &Axis, y_axis: &Axis, config: &VizConfig) {
    let black = Color::rgb(0, 0, 0);
    let axes = &config.axes;
    let painter = AxesPainter {
        area,
        config,
        direction: if axes.tick_direction == "in" { 1.0 } else { -1.0 },
    };
    let major = LineStyle::solid(black, 0.6);
    let minor = LineStyle::solid(black, 0.4);
    let grid = LineStyle {
        dash: Some("3 3".into()),
        ..LineStyle::solid(config.grid.color.with_alpha(config.grid.alpha), 0.5)
    };

    let frame = LineStyle::solid(black, 0.8);
    let (l, t, r, b) = (area.left, area.top, area.right(), area.bottom());
    for (x1, y1, x2, y2) in [(l, t, r, t), (l, b, r, b), (l, t, l, b), (r, t, r, b)] {
        canvas.line(x1, y1, x2, y2, &frame);
    }

    let x_sides: &[Side] = if axes.show_top_ticks { &[Side::Bottom, Side::Top] } else { &[Side::Bottom] };
    let y_sides: &[Side] = if axes.show_right_ticks { &[Side::Left, Side::Right] } else { &[Side::Left] };

    let x_tick_text = TextStyle::sized(config.font.tick_size)
        .anchor(TextAnchor::Middle)
        .baseline(TextBaseline::Hanging);
    for tick in &x_axis.ticks {
        let px = x_axis.to_px(tick.value, l, r);
        if !AxesPainter::visible(l, r, px) {
            continue;
        }
        if config.grid.show {
            canvas.line(px, t, px, b, &grid);
        }
        for &side in x_sides {
            painter.tick(canvas, side, px, axes.tick_length, &major);
        }
        canvas.text(px, b + 3.0 + painter.label_offset(), &tick.label, &x_tick_text);
    }
    for &v in &x_axis.minor {
        let px = x_axis.to_px(v, l, r);
        if AxesPainter::visible(l, r, px) {
            painter.tick(canvas, Side::Bottom, px, axes.minor_tick_length, &minor);
        }
    }

    let y_tick_text = TextStyle::sized(config.font.tick_size)
        .anchor(TextAnchor::End)
        .baseline(TextBaseline::Central);
    for tick in &y_axis.ticks {
        let py = y_axis.to_px(tick.value, b, t);
        if !AxesPainter::visible(b, t, py) {
            continue;
        }
        if config.grid.show {
            canvas.line(l, py, r, py, &grid);
        }
        for &side in y_sides {
            painter.tick(canvas, side, py, axes.tick_length, &major);
        }
        canvas.text(l - 4.0 - painter.label_offset(), py, &tick.label, &y_tick_text);
    }
    for &v in &y_axis.minor {
        let py = y_axis.to_px(v, b, t);
        if AxesPainter::visible(b, t, py) {
            painter.tick(canvas, Side::Left, py, axes.minor_tick_length, &minor);
        }
    }

    let title = TextStyle::sized(config.font.label_size).anchor(TextAnchor::Middle);
    if !x_axis.label.is_empty() {
        let y = b + painter.label_offset() + config.font.tick_size + 14.0;
        canvas.text(l + area.width / 2.0, y, &x_axis.label, &title);
    }
    if !y_axis.label.is_empty() {
        let widest = y_axis
            .ticks
            .iter()
            .map(|tick| canvas.measure_text(&tick.label, &y_tick_text).width)
            .fold(0.0, f64::max);
        canvas.text_rotated(l - widest - 14.0, t + area.height / 2.0, &y_axis.label, &title, -90.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> PlotArea {
        PlotArea { left: 40.0, top: 20.0, width: 240.0, height: 150.0 }
    }

    #[test]
    fn labels_and_titles_are_drawn() {
        let mut canvas = Canvas::new(300.0, 200.0);
        let x = Axis::exact(0.14, 0.16, 5).with_label("M");
        let y = Axis::padded(0.0, 100.0, 5).with_label("Counts");
        draw_axes(&mut canvas, &frame(), &x, &y, &VizConfig::default());
        let svg = canvas.finish_svg().unwrap();
        assert!(svg.contains(">0.150<"));
        assert!(svg.contains(">Counts<"));
        assert!(svg.contains("rotate(-90.0"));
    }

    #[test]
    fn inward_ticks_point_into_the_frame() {
        let area = frame();
        let painter = AxesPainter { area: &area, config: &VizConfig::default(), direction: 1.0 };
        let mut canvas = Canvas::new(300.0, 200.0);
        painter.tick(&mut canvas, Side::Bottom, 100.0, 5.0, &LineStyle::default());
        let svg = canvas.finish_svg().unwrap();
        assert!(svg.contains(r#"y1="170.00""#));
        assert!(svg.contains(r#"y2="165.00""#));
    }
}
