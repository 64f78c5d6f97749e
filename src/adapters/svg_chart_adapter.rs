//! Standalone SVG chart of a labeled series.
//!
//! Close price, volatility and fear & greed are drawn as polylines, each on
//! its own vertical scale, over background bands colored by outcome.

use crate::adapters::csv_report_adapter::create_parent;
use crate::domain::aggregate::LabeledBar;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::SpreadtesterError;
use crate::domain::outcome::Outcome;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 40.0;

#[derive(Debug, Default)]
pub struct SvgChartReport;

impl ReportPort for SvgChartReport {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SpreadtesterError> {
        let svg = render_chart(&result.name, &result.labeled_series());
        create_parent(output_path)?;
        fs::write(output_path, svg)?;
        Ok(())
    }
}

pub fn band_color(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Profitable => "green",
        Outcome::Liquidated => "indigo",
        Outcome::Unprofitable => "yellow",
        Outcome::Skipped => "white",
    }
}

pub fn render_chart(title: &str, labeled: &[LabeledBar]) -> String {
    let mut lines = vec![format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">"#
    )];
    lines.push(format!(
        r#"<rect x="0" y="0" width="{WIDTH:.0}" height="{HEIGHT:.0}" fill="white"/>"#
    ));
    lines.push(format!(
        r#"<text x="{PADDING:.0}" y="24" font-family="sans-serif" font-size="14">{}</text>"#,
        escape(title)
    ));

    if labeled.is_empty() {
        lines.push(format!(
            r#"<text x="{:.0}" y="{:.0}" font-family="sans-serif" font-size="12" text-anchor="middle">No data</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        ));
        return close_svg(lines);
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let step = plot_width / labeled.len() as f64;

    for (start, end, outcome) in runs(labeled) {
        lines.push(format!(
            r#"<rect x="{:.1}" y="{PADDING:.0}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="0.3"/>"#,
            PADDING + start as f64 * step,
            (end - start) as f64 * step,
            HEIGHT - 2.0 * PADDING,
            band_color(outcome)
        ));
    }

    let series: [(&str, &str, Vec<Option<f64>>); 3] = [
        ("close", "black", labeled.iter().map(|l| Some(l.bar.close)).collect()),
        ("volatility", "red", labeled.iter().map(|l| l.bar.volatility).collect()),
        (
            "fear_and_greed",
            "blue",
            labeled.iter().map(|l| l.bar.fear_and_greed).collect(),
        ),
    ];
    for (name, color, values) in &series {
        if let Some(points) = polyline_points(values, step) {
            lines.push(format!(
                r#"<polyline class="{name}" fill="none" stroke="{color}" stroke-width="1" points="{points}"/>"#
            ));
        }
    }

    for (i, (name, color, _)) in series.iter().enumerate() {
        lines.push(format!(
            r#"<text x="{:.0}" y="{:.0}" font-family="sans-serif" font-size="11" fill="{color}">{name}</text>"#,
            WIDTH - PADDING - 240.0 + i as f64 * 80.0,
            24.0
        ));
    }

    close_svg(lines)
}

fn close_svg(mut lines: Vec<String>) -> String {
    lines.push("</svg>".to_string());
    let mut svg = lines.join("\n");
    svg.push('\n');
    svg
}

/// Contiguous index ranges `[start, end)` sharing one outcome.
fn runs(labeled: &[LabeledBar]) -> Vec<(usize, usize, Outcome)> {
    let mut runs: Vec<(usize, usize, Outcome)> = Vec::new();
    for (i, l) in labeled.iter().enumerate() {
        match runs.last_mut() {
            Some((_, end, outcome)) if *outcome == l.outcome => *end = i + 1,
            _ => runs.push((i, i + 1, l.outcome)),
        }
    }
    runs
}

/// Points scaled to the plot area; `None` when the series has no values.
fn polyline_points(values: &[Option<f64>], step: f64) -> Option<String> {
    let present = values.iter().flatten().copied();
    let min = present.clone().fold(f64::INFINITY, f64::min);
    let max = present.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return None;
    }

    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .map(|(i, v)| {
            let x = PADDING + (i as f64 + 0.5) * step;
            let y = HEIGHT - PADDING - (v - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();
    Some(points.join(" "))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_bar::PriceBar;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn labeled(day: u32, close: f64, outcome: Outcome) -> LabeledBar {
        LabeledBar {
            bar: PriceBar::new(
                NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                close,
                close,
                close,
                close,
            )
            .with_sentiment(50.0 + day as f64, 30.0),
            outcome,
        }
    }

    #[test]
    fn empty_chart_says_no_data() {
        let svg = render_chart("empty", &[]);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("No data"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn one_element_per_line() {
        let svg = render_chart("empty", &[]);
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("<rect"));
        assert!(lines[3].contains("No data"));
        assert_eq!(lines[4], "</svg>");
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn chart_has_three_lines_and_bands() {
        let bars = vec![
            labeled(1, 100.0, Outcome::Profitable),
            labeled(2, 110.0, Outcome::Profitable),
            labeled(3, 90.0, Outcome::Liquidated),
            labeled(4, 95.0, Outcome::Skipped),
        ];
        let svg = render_chart("btc <condor>", &bars);
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert!(svg.contains(r#"fill="green""#));
        assert!(svg.contains(r#"fill="indigo""#));
        assert!(svg.contains("btc &lt;condor&gt;"));
    }

    #[test]
    fn missing_sentiment_line_is_omitted() {
        let bar = LabeledBar {
            bar: PriceBar::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0, 1.0, 1.0, 1.0),
            outcome: Outcome::Skipped,
        };
        let svg = render_chart("t", &[bar]);
        assert_eq!(svg.matches("<polyline").count(), 1);
        assert!(svg.contains(r#"class="close""#));
    }

    #[test]
    fn runs_group_adjacent_outcomes() {
        let bars = vec![
            labeled(1, 1.0, Outcome::Profitable),
            labeled(2, 1.0, Outcome::Profitable),
            labeled(3, 1.0, Outcome::Unprofitable),
            labeled(4, 1.0, Outcome::Profitable),
        ];
        assert_eq!(
            runs(&bars),
            vec![
                (0, 2, Outcome::Profitable),
                (2, 3, Outcome::Unprofitable),
                (3, 4, Outcome::Profitable),
            ]
        );
    }

    #[test]
    fn band_colors() {
        assert_eq!(band_color(Outcome::Profitable), "green");
        assert_eq!(band_color(Outcome::Liquidated), "indigo");
        assert_eq!(band_color(Outcome::Unprofitable), "yellow");
        assert_eq!(band_color(Outcome::Skipped), "white");
    }

    #[test]
    fn report_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charts").join("chart.svg");
        let result = BacktestResult {
            name: "run".to_string(),
            series: vec![labeled(1, 1.0, Outcome::Skipped).bar],
            records: Vec::new(),
        };
        SvgChartReport.write(&result, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("<polyline"));
    }
}
