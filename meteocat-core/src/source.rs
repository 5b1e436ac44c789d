use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt::Debug;

use crate::rainfall::DailyValue;

/// Filters applied when listing observation stations.
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    /// Network code, e.g. `XEMA`.
    pub network: Option<String>,
    /// Station status, e.g. `operativa` or `tancada`.
    pub status: Option<String>,
}

/// The data-fetch collaborator consumed by the collection orchestrators.
///
/// Implemented by [`crate::MeteocatClient`] against the live API; tests swap
/// in fakes. Raw station and entry shapes are passed through untouched —
/// normalization is the job of [`crate::station`] and [`crate::series`].
#[async_trait]
pub trait ObservationSource: Send + Sync + Debug {
    /// Full station list for the filter, in whatever raw shape upstream
    /// happens to return.
    async fn list_stations(&self, filter: &StationFilter) -> anyhow::Result<Vec<Value>>;

    /// Raw per-day entries for one station, variable and calendar month.
    async fn daily_statistics(
        &self,
        station_code: &str,
        variable_code: &str,
        year: i32,
        month: u32,
    ) -> anyhow::Result<Vec<Value>>;

    /// Normalized `{date, value}` daily precipitation entries for a station
    /// over an inclusive date range, sorted ascending by date.
    async fn daily_precipitation(
        &self,
        station_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        variable_code: &str,
    ) -> anyhow::Result<Vec<DailyValue>>;
}
