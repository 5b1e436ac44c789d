//! Core library for the `meteocat` CLI.
//!
//! This crate defines:
//! - Alias-based field extraction over the loosely-specified Meteocat JSON
//! - Station normalization and daily wind series building
//! - Precipitation aggregation (weekly / monthly / yearly)
//! - The Meteocat HTTP client and configuration handling
//!
//! It is used by `meteocat-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod rainfall;
pub mod series;
pub mod source;
pub mod station;

pub use aggregate::{AggregatedEntry, Frequency, aggregate_precipitation};
pub use client::MeteocatClient;
pub use config::Config;
pub use error::Error;
pub use rainfall::{
    DEFAULT_PRECIPITATION_VARIABLE, DailyValue, RainfallReport, StationSeries, collect_rainfall,
};
pub use series::{DEFAULT_WIND_VARIABLES, DailyRecord, collect_daily_wind_data, month_range};
pub use source::{ObservationSource, StationFilter};
pub use station::{Station, normalize_station};
