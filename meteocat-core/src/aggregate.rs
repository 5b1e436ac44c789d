//! Periodic aggregation of daily precipitation series.
//!
//! Best-effort by design: malformed entries (null, unparseable date,
//! non-numeric value) are expected upstream noise and are dropped without
//! logging. The only hard failure is an unknown frequency name, which is a
//! caller bug and surfaces eagerly.

use crate::error::Error;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Supported aggregation frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    pub const fn all() -> &'static [Frequency] {
        &[Frequency::Weekly, Frequency::Monthly, Frequency::Yearly]
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Frequency {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(Error::UnsupportedFrequency(value.to_string())),
        }
    }
}

/// One aggregated period: a calendar label plus the summed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEntry {
    pub period: String,
    pub value: f64,
}

/// Grouping key: year plus optional sub-period (ISO week or month number).
/// Ordering on the tuple gives the required ascending period order.
type PeriodKey = (i32, Option<u32>);

fn period_key(date: NaiveDate, frequency: Frequency) -> PeriodKey {
    match frequency {
        Frequency::Weekly => {
            // ISO week-based year, not the Gregorian year: late-December
            // dates can belong to week 1 of the following year.
            let iso = date.iso_week();
            (iso.year(), Some(iso.week()))
        }
        Frequency::Monthly => (date.year(), Some(date.month())),
        Frequency::Yearly => (date.year(), None),
    }
}

fn period_label((year, sub): PeriodKey, frequency: Frequency) -> String {
    match (frequency, sub) {
        (Frequency::Weekly, Some(week)) => format!("{year}-W{week:02}"),
        (Frequency::Monthly, Some(month)) => format!("{year}-{month:02}"),
        _ => year.to_string(),
    }
}

/// Accept an ISO date, an ISO datetime (time discarded), or any
/// ISO-date-prefixed string.
fn normalize_date(raw: &Value) -> Option<NaiveDate> {
    let text = raw.as_str()?;
    let prefix = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn numeric_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate daily entries into weekly, monthly and yearly sums with the
/// default `date`/`value` keys.
pub fn aggregate_precipitation(daily: &[Value]) -> BTreeMap<Frequency, Vec<AggregatedEntry>> {
    aggregate_precipitation_with(daily, Frequency::all(), "value", "date")
}

/// Aggregate daily entries into per-frequency sums.
///
/// Each entry is expected to be an object exposing a numeric value under
/// `value_key` and a parseable ISO date under `date_key`; anything else is
/// dropped. Frequencies are computed independently, so one entry contributes
/// to every requested output. Sums are rounded to 2 decimals and emitted
/// ascending by `(year, sub-period)`.
pub fn aggregate_precipitation_with(
    daily: &[Value],
    frequencies: &[Frequency],
    value_key: &str,
    date_key: &str,
) -> BTreeMap<Frequency, Vec<AggregatedEntry>> {
    let mut normalized: Vec<(NaiveDate, f64)> = daily
        .iter()
        .filter_map(|entry| {
            let map = entry.as_object()?;
            let date = normalize_date(map.get(date_key)?)?;
            let value = numeric_value(map.get(value_key)?)?;
            Some((date, value))
        })
        .collect();
    normalized.sort_by_key(|(date, _)| *date);

    let mut results = BTreeMap::new();
    for &frequency in frequencies {
        let mut totals: BTreeMap<PeriodKey, f64> = BTreeMap::new();
        for &(date, value) in &normalized {
            *totals.entry(period_key(date, frequency)).or_insert(0.0) += value;
        }
        let aggregated = totals
            .into_iter()
            .map(|(key, total)| AggregatedEntry {
                period: period_label(key, frequency),
                value: round2(total),
            })
            .collect();
        results.insert(frequency, aggregated);
    }
    results
}
