//! Output sinks for the collected datasets.

use anyhow::{Context, Result};
use meteocat_core::{DailyRecord, RainfallReport};
use serde_json::Value;
use std::{fs, path::Path};
use tracing::{info, warn};

/// Write daily records as CSV.
///
/// The header is the sorted union of the keys seen across all rows; rows
/// missing a column get an empty cell. With zero rows nothing is written and
/// the call reports 0 instead of erroring. Returns the number of rows
/// written.
pub fn write_csv(path: &Path, rows: &[DailyRecord]) -> Result<usize> {
    if rows.is_empty() {
        warn!("No data rows to write");
        return Ok(0);
    }

    let mut field_names: Vec<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    field_names.sort_unstable();
    field_names.dedup();

    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open CSV output: {}", path.display()))?;
    writer
        .write_record(&field_names)
        .context("Failed to write CSV header")?;

    for row in rows {
        let record: Vec<String> = field_names
            .iter()
            .map(|name| row.get(*name).map_or_else(String::new, cell_text))
            .collect();
        writer
            .write_record(&record)
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    info!(rows = rows.len(), path = %path.display(), "Saved wind dataset");
    Ok(rows.len())
}

/// Write the rainfall report as pretty-printed JSON.
pub fn write_json(path: &Path, report: &RainfallReport) -> Result<()> {
    ensure_parent_dir(path)?;

    let payload =
        serde_json::to_string_pretty(report).context("Failed to serialize rainfall report")?;
    fs::write(path, payload)
        .with_context(|| format!("Failed to write rainfall report: {}", path.display()))?;

    info!(stations = report.station_count, path = %path.display(), "Stored rainfall dataset");
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
