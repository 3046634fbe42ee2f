//! Plain-text and JSON output of chart points

use crate::data::{ChartPoint, TimeRange};

/// Formats a price the way the chart tooltip shows it
pub fn format_price(value: f64) -> String {
    format!("${:.2}", value)
}

/// Renders points as `<date>  <price>` lines under a header
pub fn render_text(symbol: &str, range: TimeRange, points: &[ChartPoint]) -> String {
    let mut out = format!("{} ({}), {} points\n", symbol, range, points.len());
    for point in points {
        out.push_str(&point.date);
        out.push_str("  ");
        out.push_str(&format_price(point.value));
        out.push('\n');
    }
    out
}

/// Renders points as a JSON array
pub fn render_json(points: &[ChartPoint]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(points)
}
