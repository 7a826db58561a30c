//! Formatted terminal output: metrics tables and reconciled series.
//!
//! We keep formatting code in one place so:
//! - the workflow code stays free of presentation concerns
//! - output changes are localized

use crate::app::pipeline::{ChartPanel, Dashboard};
use crate::domain::{FutureSeries, Metrics};
use crate::report::reconcile::DisplaySeries;

/// Format metrics as a two-column table, values to two decimals.
pub fn format_metrics(metrics: &Metrics) -> String {
    if metrics.is_empty() {
        return "(no metrics)\n".to_string();
    }
    let width = metrics
        .ordered()
        .iter()
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(0)
        .max(6);

    let mut out = String::new();
    out.push_str(&format!("{:<width$} {:>14}\n", "metric", "value"));
    out.push_str(&format!("{:-<width$} {:-<14}\n", "", ""));
    for (key, value) in metrics.ordered() {
        out.push_str(&format!("{key:<width$} {value:>14.2}\n"));
    }
    out
}

/// Format a reconciled series as a year table, marking the split.
pub fn format_series(series: &DisplaySeries, model_label: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} ({model_label})\n", series.target.display_name()));
    if series.is_empty() {
        out.push_str("(no data)\n");
        return out;
    }

    out.push_str(&format!("{:<6} {:>14} {:>14}\n", "year", "historical", "predicted"));
    out.push_str(&format!("{:-<6} {:-<14} {:-<14}\n", "", "", ""));
    for (year, hist, pred) in series.rows() {
        out.push_str(&format!("{year:<6} {:>14} {:>14}\n", fmt_opt(hist), fmt_opt(pred)));
        if series.split_year == Some(year) {
            out.push_str(&format!("{:-<6} {:^29}\n", "", "forecast starts"));
        }
    }
    out
}

pub fn format_future(future: &FutureSeries, model_label: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Future forecast ({model_label})\n"));
    out.push_str(&format!("{:<6} {:>14}\n", "year", "predicted"));
    out.push_str(&format!("{:-<6} {:-<14}\n", "", ""));
    for (year, value) in future.years().iter().zip(future.values()) {
        out.push_str(&format!("{year:<6} {value:>14.2}\n"));
    }
    out
}

/// Format the full post-training view: header, metrics, both charts, notices.
pub fn format_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str("=== Demography Forecast ===\n");
    out.push_str(&format!(
        "Model: {} ({})\n",
        dashboard.selected.display_label(),
        dashboard.selected.id()
    ));
    out.push_str(&format!("Target: {}\n\n", dashboard.selected.target().display_name()));

    out.push_str(&format_metrics(&dashboard.metrics));
    out.push('\n');

    for panel in [&dashboard.births, &dashboard.population] {
        out.push_str(&format_panel(panel));
        out.push('\n');
    }

    for notice in &dashboard.notices {
        out.push_str(&format!("note: {notice}\n"));
    }

    out
}

fn format_panel(panel: &ChartPanel) -> String {
    match panel {
        ChartPanel::Series { model, series } => format_series(series, model.display_label()),
        ChartPanel::Unavailable { target, model, reason } => format!(
            "{} ({}): unavailable: {reason}\n",
            target.display_name(),
            model.display_label()
        ),
        ChartPanel::NoSource { target } => {
            format!("{}: no model selected for this series\n", target.display_name())
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "-".to_string(),
    }
}
