//! Daily wind series building.
//!
//! One API call returns the per-day entries for a single station, variable
//! and calendar month; this module merges those into one row per day per
//! station, one column per requested variable. Failures are isolated at the
//! station × month × variable granularity: a failed fetch never aborts
//! sibling work.

use crate::{
    extract,
    source::{ObservationSource, StationFilter},
    station::{Station, normalize_station},
};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Mean wind speed and wind direction at 10 m.
pub const DEFAULT_WIND_VARIABLES: &[&str] = &["VV10m", "DV10m"];

const DATE_KEYS: &[&str] = &["data", "dia", "date"];
const VALUE_KEYS: &[&str] = &["valor", "value"];

/// One flat output row, keyed by column name. Always carries the station
/// identity columns and `date`, plus one column per requested variable.
pub type DailyRecord = BTreeMap<String, Value>;

/// The successive `(year, month)` pairs between `start` and `end`, inclusive
/// of both endpoints. Empty when `start` is after `end`.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        month += 1;
        if month == 13 {
            month = 1;
            year += 1;
        }
    }
    months
}

fn base_record(station: &Station, date: &str) -> DailyRecord {
    let mut record = DailyRecord::new();
    record.insert("station_code".into(), Value::from(station.code.clone()));
    record.insert("station_name".into(), Value::from(station.name.clone()));
    record.insert("municipality".into(), Value::from(station.municipality.clone()));
    record.insert("county".into(), Value::from(station.county.clone()));
    record.insert("latitude".into(), Value::from(station.latitude));
    record.insert("longitude".into(), Value::from(station.longitude));
    record.insert("altitude".into(), Value::from(station.altitude));
    record.insert("date".into(), Value::from(date));
    record
}

/// Collect the merged daily wind rows for every station the source reports.
///
/// Per station, entries from all `(month, variable)` fetches are merged by
/// date: a later entry for an already-seen date only sets its own variable
/// column, it never clears columns set by earlier variables. Each station's
/// block is emitted ascending by date; blocks are concatenated in station
/// order with no global re-sort.
pub async fn collect_daily_wind_data<S: ObservationSource>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    variables: &[String],
    filter: &StationFilter,
) -> Result<Vec<DailyRecord>> {
    let stations = source
        .list_stations(filter)
        .await
        .context("Failed to list Meteocat stations")?;
    info!(count = stations.len(), "Retrieved station metadata");

    // Dedupe while preserving the caller's order.
    let mut variable_codes: Vec<String> = Vec::new();
    for variable in variables {
        if !variable_codes.contains(variable) {
            variable_codes.push(variable.clone());
        }
    }

    let mut all_records = Vec::new();
    for raw in &stations {
        let station = match normalize_station(raw) {
            Ok(station) => station,
            Err(err) => {
                debug!(%err, "Skipping station with unusable metadata");
                continue;
            }
        };
        info!(
            code = %station.code,
            name = station.name.as_deref().unwrap_or("unknown"),
            "Processing station"
        );

        // Keyed by ISO date string, so values come out date-ascending.
        let mut daily_records: BTreeMap<String, DailyRecord> = BTreeMap::new();
        for (year, month) in month_range(start, end) {
            for variable_code in &variable_codes {
                let entries = match source
                    .daily_statistics(&station.code, variable_code.as_str(), year, month)
                    .await
                {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(
                            code = %station.code,
                            variable = %variable_code,
                            year,
                            month,
                            %err,
                            "Skipping month due to API error"
                        );
                        continue;
                    }
                };
                for entry in &entries {
                    let Some(date) = extract::first_match(entry, DATE_KEYS) else {
                        continue;
                    };
                    let value = extract::parse_f64(extract::first_match(entry, VALUE_KEYS));
                    let record = daily_records
                        .entry(date.clone())
                        .or_insert_with(|| base_record(&station, &date));
                    record.insert(variable_code.clone(), Value::from(value));
                }
            }
        }
        all_records.extend(daily_records.into_values());
    }
    Ok(all_records)
}
