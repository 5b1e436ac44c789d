//! Rainfall dataset collection.
//!
//! Per station: fetch the daily precipitation series for the requested date
//! range, aggregate it into weekly / monthly / yearly sums and bundle the raw
//! series next to the aggregates. A station that fails to download is logged
//! and omitted; the report keeps the rest.

use crate::{
    aggregate::{AggregatedEntry, Frequency, aggregate_precipitation},
    extract,
    source::{ObservationSource, StationFilter},
    station::{Station, normalize_station},
};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Daily accumulation is variable `35` (`precipitacio`) for most accounts.
pub const DEFAULT_PRECIPITATION_VARIABLE: &str = "35";

const DATE_KEYS: &[&str] = &["data", "dia", "date"];
const FLAT_VALUE_KEYS: &[&str] = &["valor", "precipitacio", "precipitacio24h", "acumulat"];
const NESTED_VALUE_KEYS: &[&str] = &["valor", "value"];

/// One normalized daily precipitation reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    /// ISO `YYYY-MM-DD` date.
    pub date: String,
    /// Accumulation in millimetres.
    pub value: f64,
}

/// Per-station slice of the rainfall report.
#[derive(Debug, Clone, Serialize)]
pub struct StationSeries {
    pub station: Station,
    pub daily: Vec<DailyValue>,
    pub aggregated: BTreeMap<Frequency, Vec<AggregatedEntry>>,
}

/// The structured rainfall document written by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RainfallReport {
    pub generated_at: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub station_count: usize,
    pub series: Vec<StationSeries>,
}

/// Normalize one `/dades/diaries` payload into `{date, value}` readings.
///
/// The payload may be a bare array or wrap its entries under one of several
/// keys; each entry carries the value either flat (`valor`, `precipitacio`,
/// `precipitacio24h`, `acumulat`) or nested in a `variables` array matched by
/// variable code or by a name containing "precip", with an optional
/// `lectures` reading list one level further down. Entries without a date or
/// a numeric value are dropped.
pub fn normalize_precipitation_payload(payload: &Value, variable_code: &str) -> Vec<DailyValue> {
    let mut records = Vec::new();
    for entry in extract::entry_list(payload, "dades") {
        let Some(date) = extract::first_match(&entry, DATE_KEYS) else {
            continue;
        };
        let value = extract::first_match(&entry, FLAT_VALUE_KEYS)
            .or_else(|| nested_variable_value(&entry, variable_code));
        let Some(value) = extract::parse_f64(value) else {
            continue;
        };
        let date: String = date.chars().take(10).collect();
        records.push(DailyValue { date, value });
    }
    records
}

fn nested_variable_value(entry: &Value, variable_code: &str) -> Option<String> {
    let variables = entry.get("variables")?.as_array()?;
    for variable in variables {
        if !variable.is_object() {
            continue;
        }
        let code = extract::first_match(variable, &["codi", "code"]);
        let name = extract::first_match(variable, &["nom", "name"]).unwrap_or_default();
        let matches = code.as_deref() == Some(variable_code)
            || name.to_lowercase().contains("precip");
        if !matches {
            continue;
        }
        return extract::first_match(variable, NESTED_VALUE_KEYS)
            .or_else(|| first_lecture_value(variable));
    }
    None
}

fn first_lecture_value(variable: &Value) -> Option<String> {
    let lectures = variable.get("lectures")?.as_array()?;
    lectures
        .iter()
        .find_map(|lecture| extract::first_match(lecture, &["valor"]))
}

/// Collect the per-station rainfall series and aggregates for a date range.
pub async fn collect_rainfall<S: ObservationSource>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    variable_code: &str,
    filter: &StationFilter,
) -> Result<RainfallReport> {
    let stations = source
        .list_stations(filter)
        .await
        .context("Failed to list Meteocat stations")?;
    info!(count = stations.len(), "Retrieved station metadata");

    let mut series = Vec::new();
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
            "Downloading precipitation"
        );
        let daily = match source
            .daily_precipitation(&station.code, start, end, variable_code)
            .await
        {
            Ok(daily) => daily,
            Err(err) => {
                error!(code = %station.code, %err, "Failed to download precipitation");
                continue;
            }
        };

        let daily_json: Vec<Value> = daily
            .iter()
            .map(|reading| json!({"date": reading.date, "value": reading.value}))
            .collect();
        let aggregated = aggregate_precipitation(&daily_json);

        series.push(StationSeries {
            station,
            daily,
            aggregated,
        });
    }

    Ok(RainfallReport {
        generated_at: Utc::now(),
        start_date: start,
        end_date: end,
        station_count: series.len(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn flat_entries_under_dades_are_normalized() {
        let payload = json!({"dades": [
            {"data": "2024-08-01", "valor": 1.5},
            {"dia": "2024-08-02", "precipitacio24h": "2.5"},
        ]});
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(
            readings,
            vec![
                DailyValue { date: "2024-08-01".into(), value: 1.5 },
                DailyValue { date: "2024-08-02".into(), value: 2.5 },
            ]
        );
    }

    #[test]
    fn bare_array_payload_is_accepted() {
        let payload = json!([{"date": "2024-08-01", "acumulat": 4}]);
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(readings[0].value, 4.0);
    }

    #[test]
    fn zero_accumulation_days_are_kept() {
        let payload = json!({"dades": [{"data": "2024-08-01", "valor": 0}]});
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(readings, vec![DailyValue { date: "2024-08-01".into(), value: 0.0 }]);
    }

    #[test]
    fn datetime_dates_are_truncated() {
        let payload = json!({"dades": [{"data": "2024-08-01T00:00:00Z", "valor": 1}]});
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(readings[0].date, "2024-08-01");
    }

    #[test]
    fn nested_variables_matched_by_code() {
        let payload = json!({"lectures": [
            {"data": "2024-08-01", "variables": [
                {"codi": 32, "valor": 99},
                {"codi": 35, "valor": 3.2},
            ]},
        ]});
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(readings, vec![DailyValue { date: "2024-08-01".into(), value: 3.2 }]);
    }

    #[test]
    fn nested_variables_matched_by_name_with_lectures() {
        let payload = json!({"dades": [
            {"data": "2024-08-01", "variables": [
                {"nom": "Precipitació acumulada", "lectures": [
                    {"valor": null},
                    {"valor": 7.1},
                ]},
            ]},
        ]});
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(readings, vec![DailyValue { date: "2024-08-01".into(), value: 7.1 }]);
    }

    #[test]
    fn entries_without_date_or_numeric_value_are_dropped() {
        let payload = json!({"dades": [
            {"valor": 1.0},
            {"data": "2024-08-01", "valor": "soggy"},
            {"data": "2024-08-02"},
            {"data": "2024-08-03", "valor": 2.0},
        ]});
        let readings = normalize_precipitation_payload(&payload, "35");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].date, "2024-08-03");
    }

    #[derive(Debug, Default)]
    struct FakeSource {
        stations: Vec<Value>,
        precipitation: HashMap<String, Vec<DailyValue>>,
    }

    #[async_trait]
    impl ObservationSource for FakeSource {
        async fn list_stations(&self, _filter: &StationFilter) -> anyhow::Result<Vec<Value>> {
            Ok(self.stations.clone())
        }

        async fn daily_statistics(
            &self,
            _station_code: &str,
            _variable_code: &str,
            _year: i32,
            _month: u32,
        ) -> anyhow::Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn daily_precipitation(
            &self,
            station_code: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _variable_code: &str,
        ) -> anyhow::Result<Vec<DailyValue>> {
            self.precipitation
                .get(station_code)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("simulated download failure"))
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    #[tokio::test]
    async fn report_bundles_daily_and_aggregated_series() {
        let mut source = FakeSource {
            stations: vec![json!({"codi": "X1", "nom": "Estació u"})],
            ..Default::default()
        };
        source.precipitation.insert(
            "X1".into(),
            vec![
                DailyValue { date: "2024-08-01".into(), value: 1.0 },
                DailyValue { date: "2024-08-08".into(), value: 3.0 },
            ],
        );

        let report = collect_rainfall(
            &source,
            date(2024, 8, 1),
            date(2024, 8, 31),
            DEFAULT_PRECIPITATION_VARIABLE,
            &StationFilter::default(),
        )
        .await
        .expect("collection must succeed");

        assert_eq!(report.station_count, 1);
        let series = &report.series[0];
        assert_eq!(series.station.code, "X1");
        assert_eq!(series.daily.len(), 2);
        assert_eq!(series.aggregated[&Frequency::Monthly][0].value, 4.0);
        assert_eq!(series.aggregated[&Frequency::Yearly][0].period, "2024");
    }

    #[tokio::test]
    async fn failing_station_is_omitted_without_aborting_the_run() {
        let mut source = FakeSource {
            stations: vec![
                json!({"codi": "DOWN"}),
                json!({"nom": "codeless"}),
                json!({"codi": "UP"}),
            ],
            ..Default::default()
        };
        source.precipitation.insert(
            "UP".into(),
            vec![DailyValue { date: "2024-08-01".into(), value: 2.0 }],
        );

        let report = collect_rainfall(
            &source,
            date(2024, 8, 1),
            date(2024, 8, 31),
            DEFAULT_PRECIPITATION_VARIABLE,
            &StationFilter::default(),
        )
        .await
        .expect("collection must succeed");

        assert_eq!(report.station_count, 1);
        assert_eq!(report.series[0].station.code, "UP");
    }
}
