//! Export reconciled chart series to CSV.
//!
//! One row per `(target, year)`, empty cells where a value is null, so the
//! file opens cleanly in spreadsheets.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::app::pipeline::{ChartPanel, Dashboard};
use crate::error::AppError;
use crate::report::reconcile::DisplaySeries;

/// Write every populated chart of `dashboard` to `path`.
pub fn write_dashboard_csv(path: &Path, dashboard: &Dashboard) -> Result<(), AppError> {
    let charts: Vec<&DisplaySeries> = [&dashboard.births, &dashboard.population]
        .into_iter()
        .filter_map(|panel| match panel {
            ChartPanel::Series { series, .. } => Some(series),
            _ => None,
        })
        .collect();
    write_series_csv(path, &charts)
}

pub fn write_series_csv(path: &Path, charts: &[&DisplaySeries]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_rows(&mut out, charts)
        .and_then(|()| out.flush())
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV '{}': {e}", path.display())))?;

    tracing::info!("wrote {} chart(s) to {}", charts.len(), path.display());
    Ok(())
}

fn write_rows(out: &mut impl Write, charts: &[&DisplaySeries]) -> std::io::Result<()> {
    writeln!(out, "target,year,historical,predicted")?;
    for chart in charts {
        let target = chart.target.display_name().to_lowercase();
        for (year, hist, pred) in chart.rows() {
            writeln!(
                out,
                "{target},{year},{},{}",
                hist.map(|v| v.to_string()).unwrap_or_default(),
                pred.map(|v| v.to_string()).unwrap_or_default(),
            )?;
        }
    }
    Ok(())
}
