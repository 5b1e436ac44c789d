use thiserror::Error;

/// Typed errors for the fatal failure classes of the collector core.
///
/// Everything else (failed fetches, unusable station records, malformed
/// aggregation entries) is absorbed as "skip and continue" by the callers.
#[derive(Debug, Error)]
pub enum Error {
    /// None of the candidate keys resolved to a non-empty value. Raised only
    /// where the field is mandatory, i.e. for the station code.
    #[error("record contains none of the expected keys {keys:?}")]
    MissingField { keys: &'static [&'static str] },

    /// An aggregation frequency name the caller passed is not supported.
    #[error("unsupported aggregation frequency '{0}' (expected one of: weekly, monthly, yearly)")]
    UnsupportedFrequency(String),
}
