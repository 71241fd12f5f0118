//! Grouped bar chart of the comparison table, rendered as standalone SVG.

use std::fmt::{self, Write};

use iv_types::{internal_error, ComparisonTable, IvResult};

const TITLE: &str = "Feature Values Comparison Across Models";
const X_LABEL: &str = "Features";
const Y_LABEL: &str = "Feature Values";
const LEGEND_TITLE: &str = "Models";

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22",
    "#17becf",
];

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 190.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const PLOT_HEIGHT: f64 = 360.0;
const BAR_WIDTH: f64 = 18.0;
const GROUP_GAP: f64 = 24.0;
const Y_TICKS: usize = 5;

/// One group of bars per feature, one bar per model, models in processing order.
pub fn render_comparison_svg(table: &ComparisonTable) -> IvResult<String> {
    let mut svg = String::new();
    write_svg(&mut svg, table).map_err(|e| internal_error!("Failed to render chart: {}", e))?;
    Ok(svg)
}

fn write_svg(svg: &mut String, table: &ComparisonTable) -> fmt::Result {
    let features = table.features();
    let models = table.models();

    let group_width = models.len().max(1) as f64 * BAR_WIDTH + GROUP_GAP;
    let plot_width = (features.len() as f64 * group_width).max(320.0);
    let width = MARGIN_LEFT + plot_width + MARGIN_RIGHT;
    let height = MARGIN_TOP + PLOT_HEIGHT + MARGIN_BOTTOM;

    let (low, high) = value_range(table);
    let to_y = |v: f64| MARGIN_TOP + (high - v) / (high - low) * PLOT_HEIGHT;
    let baseline = to_y(0.0);

    writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"#
    )?;
    writeln!(svg, r#"  <style>text {{ font-family: sans-serif; font-size: 12px; }}</style>"#)?;
    writeln!(svg, r##"  <rect width="100%" height="100%" fill="#ffffff"/>"##)?;
    writeln!(
        svg,
        r#"  <text x="{:.1}" y="28" text-anchor="middle" font-size="16">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        TITLE
    )?;

    // Gridlines and y-axis labels.
    for i in 0..=Y_TICKS {
        let value = low + (high - low) * i as f64 / Y_TICKS as f64;
        let y = to_y(value);
        writeln!(
            svg,
            r##"  <line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e0e0e0"/>"##,
            MARGIN_LEFT,
            MARGIN_LEFT + plot_width
        )?;
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0,
            tick_label(value)
        )?;
    }

    for (f, feature) in features.iter().enumerate() {
        let group_x = MARGIN_LEFT + f as f64 * group_width + GROUP_GAP / 2.0;
        for (m, model) in models.iter().enumerate() {
            let Some(value) = table.value(f, m).filter(|v| v.is_finite()) else {
                continue;
            };
            let top = to_y(value.max(0.0));
            let bar_height = (to_y(value.min(0.0)) - top).max(0.0);
            writeln!(
                svg,
                r#"  <rect x="{:.1}" y="{top:.1}" width="{BAR_WIDTH:.1}" height="{bar_height:.1}" fill="{}"><title>{}: {}</title></rect>"#,
                group_x + m as f64 * BAR_WIDTH,
                PALETTE[m % PALETTE.len()],
                escape(model),
                value
            )?;
        }
        let label_x = group_x + models.len() as f64 * BAR_WIDTH / 2.0;
        let label_y = MARGIN_TOP + PLOT_HEIGHT + 16.0;
        writeln!(
            svg,
            r#"  <text x="{label_x:.1}" y="{label_y:.1}" text-anchor="end" transform="rotate(-30 {label_x:.1} {label_y:.1})">{}</text>"#,
            escape(feature)
        )?;
    }

    // Axes: the horizontal one sits at zero so negative bars hang below it.
    writeln!(
        svg,
        r##"  <line x1="{MARGIN_LEFT:.1}" y1="{MARGIN_TOP:.1}" x2="{MARGIN_LEFT:.1}" y2="{:.1}" stroke="#333333"/>"##,
        MARGIN_TOP + PLOT_HEIGHT
    )?;
    writeln!(
        svg,
        r##"  <line x1="{MARGIN_LEFT:.1}" y1="{baseline:.1}" x2="{:.1}" y2="{baseline:.1}" stroke="#333333"/>"##,
        MARGIN_LEFT + plot_width
    )?;
    writeln!(
        svg,
        r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        height - 12.0,
        X_LABEL
    )?;
    let y_label_y = MARGIN_TOP + PLOT_HEIGHT / 2.0;
    writeln!(
        svg,
        r#"  <text x="20" y="{y_label_y:.1}" text-anchor="middle" transform="rotate(-90 20 {y_label_y:.1})">{}</text>"#,
        Y_LABEL
    )?;

    let legend_x = MARGIN_LEFT + plot_width + 20.0;
    writeln!(
        svg,
        r#"  <text x="{legend_x:.1}" y="{MARGIN_TOP:.1}" font-weight="bold">{}</text>"#,
        LEGEND_TITLE
    )?;
    for (m, model) in models.iter().enumerate() {
        let y = MARGIN_TOP + 14.0 + m as f64 * 20.0;
        writeln!(
            svg,
            r#"  <rect x="{legend_x:.1}" y="{y:.1}" width="12" height="12" fill="{}"/>"#,
            PALETTE[m % PALETTE.len()]
        )?;
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}">{}</text>"#,
            legend_x + 18.0,
            y + 10.0,
            escape(model)
        )?;
    }

    writeln!(svg, "</svg>")
}

/// Value extent including zero, never empty.
fn value_range(table: &ComparisonTable) -> (f64, f64) {
    let mut low = 0.0_f64;
    let mut high = 0.0_f64;
    for f in 0..table.features().len() {
        for m in 0..table.models().len() {
            if let Some(v) = table.value(f, m).filter(|v| v.is_finite()) {
                low = low.min(v);
                high = high.max(v);
            }
        }
    }
    if high - low <= f64::EPSILON {
        high = low + 1.0;
    }
    (low, high)
}

fn tick_label(value: f64) -> String {
    if value != 0.0 && (value.abs() >= 1e5 || value.abs() < 1e-2) {
        format!("{:.1e}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
