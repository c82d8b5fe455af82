//! Two-panel SVG chart of a speedup model.
//!
//! Left: average execution time against process count. Right: speedup and
//! efficiency against process count, with a dashed ideal-speedup line of
//! slope 1.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::speedup::SpeedupModel;

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 500.0;
const PANEL_WIDTH: f64 = WIDTH / 2.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 25.0;
const MARGIN_TOP: f64 = 45.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;

const TIME_COLOR: &str = "#1f4fd8";
const SPEEDUP_COLOR: &str = "#d62728";
const EFFICIENCY_COLOR: &str = "#2ca02c";
const IDEAL_COLOR: &str = "#000000";

/// Plot area of one panel, mapping data coordinates to pixels.
struct Panel {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_max: f64,
    y_max: f64,
}

impl Panel {
    fn new(index: usize, x_max: f64, y_max: f64) -> Self {
        Self {
            left: index as f64 * PANEL_WIDTH + MARGIN_LEFT,
            top: MARGIN_TOP,
            width: PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
            height: HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
            x_max,
            y_max,
        }
    }

    fn px(&self, x: f64) -> f64 {
        self.left + x / self.x_max * self.width
    }

    fn py(&self, y: f64) -> f64 {
        self.top + self.height - y / self.y_max * self.height
    }

    fn frame(&self, out: &mut String, title: &str, y_label: &str) -> std::fmt::Result {
        let bottom = self.top + self.height;
        let center_x = self.left + self.width / 2.0;
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="15" font-weight="bold">{}</text>"#,
            center_x,
            self.top - 18.0,
            title
        )?;
        for i in 0..=TICKS {
            let fraction = i as f64 / TICKS as f64;
            let x_value = self.x_max * fraction;
            let y_value = self.y_max * fraction;
            let x = self.px(x_value);
            let y = self.py(y_value);
            writeln!(
                out,
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#dddddd"/>"##,
                self.left,
                y,
                self.left + self.width,
                y
            )?;
            writeln!(
                out,
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#dddddd"/>"##,
                x, self.top, x, bottom
            )?;
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
                self.left - 6.0,
                y + 4.0,
                tick_label(y_value)
            )?;
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
                x,
                bottom + 16.0,
                tick_label(x_value)
            )?;
        }
        writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black"/>"#,
            self.left, self.top, self.width, self.height
        )?;
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">Number of Processes</text>"#,
            center_x,
            bottom + 40.0
        )?;
        let label_x = self.left - 50.0;
        let label_y = self.top + self.height / 2.0;
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 {:.1} {:.1})">{}</text>"#,
            label_x, label_y, label_x, label_y, y_label
        )
    }

    fn series(&self, out: &mut String, points: &[(f64, f64)], color: &str) -> std::fmt::Result {
        let path = points
            .iter()
            .map(|&(x, y)| format!("{:.1},{:.1}", self.px(x), self.py(y)))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            out,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            path, color
        )?;
        for &(x, y) in points {
            writeln!(
                out,
                r#"<circle cx="{:.1}" cy="{:.1}" r="5" fill="{}"/>"#,
                self.px(x),
                self.py(y),
                color
            )?;
        }
        Ok(())
    }

    /// Ideal speedup `y = x`, clipped to the panel.
    fn ideal_line(&self, out: &mut String) -> std::fmt::Result {
        let end = self.x_max.min(self.y_max);
        writeln!(
            out,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-opacity="0.5" stroke-dasharray="6 4"/>"#,
            self.px(0.0),
            self.py(0.0),
            self.px(end),
            self.py(end),
            IDEAL_COLOR
        )
    }

    fn legend(&self, out: &mut String, entries: &[(&str, &str, bool)]) -> std::fmt::Result {
        let x = self.left + 12.0;
        for (i, (label, color, dashed)) in entries.iter().enumerate() {
            let y = self.top + 16.0 + i as f64 * 18.0;
            let dash = if *dashed { r#" stroke-dasharray="6 4""# } else { "" };
            writeln!(
                out,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"{}/>"#,
                x,
                y,
                x + 24.0,
                y,
                color,
                dash
            )?;
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="12">{}</text>"#,
                x + 30.0,
                y + 4.0,
                label
            )?;
        }
        Ok(())
    }
}

/// Smallest 1/2/5 x 10^k value that is at least `value`.
fn nice_ceiling(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powi(value.log10().floor() as i32);
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|step| step * magnitude)
        .find(|candidate| *candidate >= value)
        .unwrap_or(10.0 * magnitude)
}

fn tick_label(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// `None` when the model is empty; there is nothing to plot.
pub fn render_plot(model: &SpeedupModel) -> Option<String> {
    if model.is_empty() {
        return None;
    }
    let mut out = String::new();
    render_into(&mut out, model).ok()?;
    Some(out)
}

fn render_into(out: &mut String, model: &SpeedupModel) -> std::fmt::Result {
    let records = model.records();
    let x_max = nice_ceiling(records.iter().map(|r| r.process_count as f64).fold(0.0, f64::max));

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" font-family="sans-serif">"#,
        WIDTH, HEIGHT, WIDTH, HEIGHT
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

    let times: Vec<(f64, f64)> = records.iter().map(|r| (r.process_count as f64, r.time)).collect();
    let time_max = nice_ceiling(times.iter().map(|&(_, t)| t).fold(0.0, f64::max) * 1.1);
    let time_panel = Panel::new(0, x_max, time_max);
    time_panel.frame(out, "Execution Time vs Number of Processes", "Execution Time (seconds)")?;
    time_panel.series(out, &times, TIME_COLOR)?;

    let speedups: Vec<(f64, f64)> = records.iter().map(|r| (r.process_count as f64, r.speedup)).collect();
    let efficiencies: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (r.process_count as f64, r.efficiency))
        .collect();
    let ratio_max = nice_ceiling(
        speedups
            .iter()
            .chain(efficiencies.iter())
            .map(|&(_, v)| v)
            .fold(0.0, f64::max)
            * 1.1,
    );
    let ratio_panel = Panel::new(1, x_max, ratio_max);
    ratio_panel.frame(out, "Speedup and Efficiency vs Number of Processes", "Speedup / Efficiency")?;
    ratio_panel.ideal_line(out)?;
    ratio_panel.series(out, &speedups, SPEEDUP_COLOR)?;
    ratio_panel.series(out, &efficiencies, EFFICIENCY_COLOR)?;
    ratio_panel.legend(
        out,
        &[
            ("Speedup", SPEEDUP_COLOR, false),
            ("Efficiency", EFFICIENCY_COLOR, false),
            ("Ideal Speedup", IDEAL_COLOR, true),
        ],
    )?;

    writeln!(out, "</svg>")
}

/// Write the chart to `path`. Returns `false` (and writes nothing) when the
/// model has no valid records.
pub fn write_plot(path: &Path, model: &SpeedupModel) -> Result<bool> {
    let Some(svg) = render_plot(model) else {
        warn!(path = %path.display(), "no valid results for plotting; skipping chart");
        return Ok(false);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create plot directory {}", parent.display()))?;
    }
    fs::write(path, svg).with_context(|| format!("write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sweep_of;

    #[test]
    fn test_nice_ceiling_steps() {
        assert_eq!(nice_ceiling(0.0), 1.0);
        assert_eq!(nice_ceiling(0.8), 1.0);
        assert_eq!(nice_ceiling(3.3), 5.0);
        assert_eq!(nice_ceiling(8.0), 10.0);
        assert_eq!(nice_ceiling(11.0), 20.0);
        assert_eq!(nice_ceiling(16.0), 20.0);
        assert_eq!(nice_ceiling(250.0), 500.0);
    }

    #[test]
    fn test_render_has_both_panels_and_ideal_line() {
        let model = SpeedupModel::from_sweep(&sweep_of(&[(1, &[10.0]), (2, &[5.0]), (4, &[3.0])]));
        let svg = render_plot(&model).expect("plottable model");
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Execution Time vs Number of Processes"));
        assert!(svg.contains("Speedup and Efficiency vs Number of Processes"));
        assert!(svg.contains("Ideal Speedup"));
        assert!(svg.contains("stroke-dasharray"));
        assert_eq!(svg.matches("<polyline").count(), 3);
        // One marker per record in each of the three series.
        assert_eq!(svg.matches("<circle").count(), 9);
    }

    #[test]
    fn test_empty_model_is_skipped_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plot.svg");
        let model = SpeedupModel::from_sweep(&sweep_of(&[(1, &[]), (2, &[])]));
        assert!(render_plot(&model).is_none());
        assert!(!write_plot(&path, &model).expect("skip is not an error"));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_plot_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("charts").join("plot.svg");
        let model = SpeedupModel::from_sweep(&sweep_of(&[(4, &[2.0])]));
        assert!(write_plot(&path, &model).expect("write plot"));
        let svg = std::fs::read_to_string(&path).expect("read plot");
        assert!(svg.contains("<circle"));
    }
}
