//! Plain-text rendering of tables and statistics for the terminal.

use std::fmt::Write as _;

use crate::{
    analysis::Summary,
    frame::Table,
    stats::DisparityStats,
};

const STAT_HEADERS: [&str; 6] = ["indicator", "mean", "median", "std", "min", "max"];

/// Renders left-aligned columns separated by two spaces, with a dashed rule
/// under the header.
pub fn render_rows(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", join_padded(headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(output, "{}", join_padded(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", join_padded(row, &widths));
    }
    output
}

/// Renders at most `limit` rows of `table`, noting how many were left out.
pub fn render_table(table: &Table, limit: Option<usize>) -> String {
    if table.column_count() == 0 {
        return "(no columns)\n".to_string();
    }
    let headers: Vec<String> = table.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = table.to_string_rows();
    let hidden = match limit {
        Some(limit) if rows.len() > limit => {
            let hidden = rows.len() - limit;
            rows.truncate(limit);
            hidden
        }
        _ => 0,
    };
    let mut output = render_rows(&headers, &rows);
    if hidden > 0 {
        let _ = writeln!(output, "... {hidden} more row(s)");
    }
    output
}

pub fn render_summary(summary: &Summary) -> String {
    let headers: Vec<String> = STAT_HEADERS.iter().map(|s| s.to_string()).collect();
    let rows: Vec<Vec<String>> = summary
        .indicators
        .iter()
        .map(|(name, stats)| stats.render_row(name))
        .collect();
    let mut output = format!("Total regions: {}\n", summary.total_regions);
    output.push_str(&render_rows(&headers, &rows));
    output
}

pub fn render_disparities<'a>(
    disparities: impl IntoIterator<Item = (&'a String, &'a DisparityStats)>,
) -> String {
    let mut headers: Vec<String> = STAT_HEADERS.iter().map(|s| s.to_string()).collect();
    headers.push("range".to_string());
    let rows: Vec<Vec<String>> = disparities
        .into_iter()
        .map(|(name, stats)| stats.render_row(name))
        .collect();
    render_rows(&headers, &rows)
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    let mut line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = flatten_whitespace(cell);
            let padding = width.saturating_sub(cell_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn flatten_whitespace(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}
