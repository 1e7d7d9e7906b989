use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Line above the frame: bold experiment name and status on the left,
/// collision system and `title` on the right.
pub fn draw_header(canvas: &mut Canvas, area: &PlotArea, config: &VizConfig, title: &str) {
    let size = 1.3 * config.font.label_size;
    let y = area.top - 6.0;
    let experiment = &config.experiment;

    if !experiment.name.is_empty() {
        let x = area.left + 0.02 * area.width;
        let name = TextStyle::sized(size).bold();
        canvas.text(x, y, &experiment.name, &name);
        if !experiment.status.is_empty() {
            let dx = canvas.measure_text(&experiment.name, &name).width + 5.0;
            canvas.text(x + dx, y, &experiment.status, &TextStyle::sized(0.85 * size));
        }
    }

    let right: Vec<&str> =
        [experiment.system.as_str(), title].into_iter().filter(|s| !s.is_empty()).collect();
    if !right.is_empty() {
        let style = TextStyle::sized(config.font.tick_size)
            .color(Color::rgb(80, 80, 80))
            .anchor(TextAnchor::End);
        canvas.text(area.right(), y, &right.join(", "), &style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cfg: &VizConfig, title: &str) -> String {
        let mut canvas = Canvas::new(400.0, 300.0);
        let area = PlotArea { left: 50.0, top: 40.0, width: 330.0, height: 220.0 };
        draw_header(&mut canvas, &area, cfg, title);
        canvas.finish_svg().unwrap()
    }

    #[test]
    fn system_and_title_share_the_right_label() {
        let mut cfg = VizConfig::default();
        cfg.experiment.name = "ALICE".into();
        cfg.experiment.status = "Preliminary".into();
        cfg.experiment.system = "pp, 13.6 TeV".into();
        let svg = header(&cfg, "2.0 < pT < 4.0 GeV/c");
        assert!(svg.contains(r#"font-weight="bold">ALICE<"#));
        assert!(svg.contains(">Preliminary<"));
        assert!(svg.contains(">pp, 13.6 TeV, 2.0 &lt; pT &lt; 4.0 GeV/c<"));
    }

    #[test]
    fn empty_header_draws_nothing() {
        assert!(!header(&VizConfig::default(), "").contains("<text"));
    }
}
