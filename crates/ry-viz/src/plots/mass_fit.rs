//! Data points with the total, signal and background fit curves.

use crate::artifact::MassFitArtifact;
use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::header::draw_header;
use crate::layout::axes::Axis;
use crate::layout::legend::{LegendEntry, draw_legend};
use crate::layout::margins::PlotArea;
use crate::plots::axes_draw::draw_axes;
use crate::primitives::*;

pub fn render(artifact: &MassFitArtifact, config: &VizConfig) -> crate::Result<String> {
    let n = artifact.data_y.len();
    let x_min = artifact.bin_edges[0];
    let x_max = artifact.bin_edges[n];

    let y_hi = artifact
        .data_y
        .iter()
        .zip(&artifact.data_yerr)
        .map(|(y, e)| y + e)
        .chain(artifact.total_y.iter().copied())
        .fold(0.0_f64, f64::max);
    let y_top = if y_hi > 0.0 { y_hi * 1.35 } else { 1.0 };

    let x_axis = Axis::exact(x_min, x_max, 6).with_label(&artifact.x_label);
    let y_axis = Axis::padded(0.0, y_top, 6).with_label(&artifact.y_label);

    let mut canvas = Canvas::new(config.figure.width, config.figure.height);
    let area = PlotArea::fit(&canvas, &x_axis, &y_axis, config);

    canvas.push_clip(area.left, area.top, area.width, area.height);
    let c = &config.colors;
    let curves = [
        (&artifact.background_y, LineStyle::dashed(c.background, 1.4)),
        (&artifact.signal_y, LineStyle::solid(c.signal, 1.4)),
        (&artifact.total_y, LineStyle::solid(c.total, 1.6)),
    ];
    for (ys, style) in &curves {
        draw_curve(&mut canvas, &area, &x_axis, &y_axis, &artifact.curve_x, ys, style);
    }
    draw_points(&mut canvas, &area, &x_axis, &y_axis, artifact, &artifact.data_y, c.data);
    canvas.pop_clip();

    draw_axes(&mut canvas, &area, &x_axis, &y_axis, config);
    draw_header(&mut canvas, &area, config, &artifact.title);

    let entries = [
        LegendEntry::marker("Data", c.data),
        LegendEntry::line("Total fit", c.total),
        LegendEntry::line("Signal", c.signal),
        LegendEntry::dashed("Background", c.background),
    ];
    draw_legend(&mut canvas, &area, &entries, config.font.size);
    draw_info(&mut canvas, &area, &artifact.info, config.font.size);

    Ok(canvas.finish_svg()?)
}

/// Polyline of `ys` over `xs` in data coordinates.
pub(crate) fn draw_curve(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    xs: &[f64],
    ys: &[f64],
    style: &LineStyle,
) {
    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(_, y)| y.is_finite())
        .map(|(&x, &y)| {
            (
                x_axis.to_px(x, area.left, area.right()),
                y_axis.to_px(y, area.bottom(), area.top),
            )
        })
        .collect();
    canvas.polyline(&points, style);
}

/// Markers at bin centres with vertical error bars from `data_yerr`.
pub(crate) fn draw_points(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    artifact: &MassFitArtifact,
    ys: &[f64],
    color: Color,
) {
    let bar_style = LineStyle::solid(color, 0.8);
    let marker = MarkerStyle::new(color);
    for (i, (&y, &err)) in ys.iter().zip(&artifact.data_yerr).enumerate() {
        let px = x_axis.to_px(artifact.bin_center(i), area.left, area.right());
        let py = y_axis.to_px(y, area.bottom(), area.top);
        if err > 0.0 {
            let lo = y_axis.to_px(y - err, area.bottom(), area.top);
            let hi = y_axis.to_px(y + err, area.bottom(), area.top);
            canvas.error_bar(px, lo, hi, 0.0, &bar_style);
        }
        canvas.marker(px, py, &marker);
    }
}

/// Left-aligned text block in the top-left corner of the frame.
pub(crate) fn draw_info(canvas: &mut Canvas, area: &PlotArea, lines: &[String], font_size: f64) {
    let style = TextStyle::sized(0.85 * font_size).baseline(TextBaseline::Hanging);
    let row = font_size + 3.0;
    for (i, line) in lines.iter().enumerate() {
        canvas.text(area.left + 8.0, area.top + 8.0 + i as f64 * row, line, &style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::tests::sample;

    #[test]
    fn draws_all_components() {
        let svg = render(&sample(), &VizConfig::default()).unwrap();
        // 30 data points plus the legend marker
        assert_eq!(svg.matches("<circle").count(), 31);
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert!(svg.contains("stroke-dasharray=\"6 3\""));
        assert!(svg.contains("S = 480 +/- 40"));
        assert!(svg.contains("2.0 &lt; pT &lt; 4.0 GeV/c"));
    }

    #[test]
    fn empty_spectrum_still_renders() {
        let mut a = sample();
        a.data_y.iter_mut().for_each(|v| *v = 0.0);
        a.data_yerr.iter_mut().for_each(|v| *v = 0.0);
        a.total_y.iter_mut().for_each(|v| *v = 0.0);
        let svg = render(&a, &VizConfig::default()).unwrap();
        assert!(svg.ends_with("</svg>\n"));
    }
}
