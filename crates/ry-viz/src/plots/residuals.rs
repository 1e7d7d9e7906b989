//! Background-subtracted data with the fitted signal on top.

use crate::artifact::MassFitArtifact;
use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::header::draw_header;
use crate::layout::axes::Axis;
use crate::layout::legend::{LegendEntry, draw_legend};
use crate::layout::margins::PlotArea;
use crate::plots::axes_draw::draw_axes;
use crate::plots::mass_fit::{draw_curve, draw_info, draw_points};
use crate::primitives::*;

pub fn render(artifact: &MassFitArtifact, config: &VizConfig) -> crate::Result<String> {
    let n = artifact.data_y.len();
    let x_min = artifact.bin_edges[0];
    let x_max = artifact.bin_edges[n];

    let residual: Vec<f64> =
        artifact.data_y.iter().zip(&artifact.background_bin_y).map(|(d, b)| d - b).collect();

    let (lo, hi) = residual
        .iter()
        .zip(&artifact.data_yerr)
        .map(|(r, e)| (r - e, r + e))
        .chain(artifact.signal_y.iter().map(|&s| (s, s)))
        .fold((0.0_f64, 0.0_f64), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
    let span = (hi - lo).max(1.0);
    let y_axis = Axis::padded(lo - 0.1 * span, hi + 0.35 * span, 6).with_label(&artifact.y_label);
    let x_axis = Axis::exact(x_min, x_max, 6).with_label(&artifact.x_label);

    let mut canvas = Canvas::new(config.figure.width, config.figure.height);
    let area = PlotArea::fit(&canvas, &x_axis, &y_axis, config);
    let c = &config.colors;

    canvas.push_clip(area.left, area.top, area.width, area.height);
    let zero = y_axis.to_px(0.0, area.bottom(), area.top);
    canvas.line(area.left, zero, area.right(), zero, &LineStyle::dashed(c.background, 0.8));
    draw_curve(
        &mut canvas,
        &area,
        &x_axis,
        &y_axis,
        &artifact.curve_x,
        &artifact.signal_y,
        &LineStyle::solid(c.signal, 1.4),
    );
    draw_points(&mut canvas, &area, &x_axis, &y_axis, artifact, &residual, c.data);
    canvas.pop_clip();

    draw_axes(&mut canvas, &area, &x_axis, &y_axis, config);
    draw_header(&mut canvas, &area, config, &artifact.title);

    let entries = [LegendEntry::marker("Data - background", c.data), LegendEntry::line("Signal", c.signal)];
    draw_legend(&mut canvas, &area, &entries, config.font.size);
    draw_info(&mut canvas, &area, &artifact.info, config.font.size);

    Ok(canvas.finish_svg()?)
}
