//! HTTP client for the Meteocat public API.

use crate::{
    extract,
    rainfall::{DailyValue, normalize_precipitation_payload},
    source::{ObservationSource, StationFilter},
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.meteocat.gencat.cat/xema/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const RETRY_WAIT: Duration = Duration::from_secs(1);

/// Precipitation requests are chunked to stay within the API's per-request
/// date-range limit.
const PRECIPITATION_CHUNK_DAYS: i64 = 31;

/// Minimal wrapper around the Meteocat public API.
///
/// Requests are issued strictly sequentially by the callers; the only
/// resilience here is per-request retry with linear backoff on rate limits
/// and transient failures.
#[derive(Debug, Clone)]
pub struct MeteocatClient {
    http: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    retry_wait: Duration,
}

impl MeteocatClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different base URL (e.g. a local stub).
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: MAX_RETRIES,
            retry_wait: RETRY_WAIT,
        }
    }

    /// Return the available observation stations, optionally filtered by
    /// status (`operativa`, `tancada`, ...) and network code (e.g. `XEMA`).
    pub async fn list_stations(&self, filter: &StationFilter) -> Result<Vec<Value>> {
        let mut params = vec![("limit", "5000".to_string())];
        if let Some(status) = &filter.status {
            params.push(("estat", status.clone()));
        }
        if let Some(network) = &filter.network {
            params.push(("xarxa", network.clone()));
        }

        let payload = self.request_json("/estacions/metadades", &params).await?;
        let stations = extract::entry_list(&payload, "estacions");
        info!(count = stations.len(), "Loaded stations");
        Ok(stations)
    }

    /// Raw per-day statistics for one station, variable and calendar month.
    pub async fn fetch_daily_variable_statistics(
        &self,
        station_code: &str,
        variable_code: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Value>> {
        let path = format!("/variables/estadistics/diaris/{variable_code}");
        let params = vec![
            ("codiEstacio", station_code.to_string()),
            ("any", year.to_string()),
            ("mes", format!("{month:02}")),
        ];
        let payload = self.request_json(&path, &params).await?;
        Ok(extract::entry_list(&payload, "valors"))
    }

    /// Daily precipitation accumulation for a station over an inclusive date
    /// range, fetched in 31-day chunks and normalized to `{date, value}`.
    pub async fn fetch_daily_precipitation(
        &self,
        station_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        variable_code: &str,
    ) -> Result<Vec<DailyValue>> {
        let mut results = Vec::new();
        let mut current = start;
        while current <= end {
            let chunk_end =
                (current + chrono::Duration::days(PRECIPITATION_CHUNK_DAYS - 1)).min(end);
            let params = vec![
                ("codiEstacio", station_code.to_string()),
                ("dataInici", current.to_string()),
                ("dataFi", chunk_end.to_string()),
                ("variables", variable_code.to_string()),
            ];
            let payload = self.request_json("/dades/diaries", &params).await?;
            let chunk = normalize_precipitation_payload(&payload, variable_code);
            debug!(
                station = station_code,
                from = %current,
                to = %chunk_end,
                records = chunk.len(),
                "Fetched precipitation chunk"
            );
            results.extend(chunk);
            current = chunk_end + chrono::Duration::days(1);
        }
        results.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(results)
    }

    async fn request_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = self
                .http
                .get(&url)
                .header("X-Api-Key", &self.api_key)
                .query(params)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match result {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    if attempt > self.max_retries {
                        return Err(anyhow!(
                            "Meteocat rate limit persisted after {attempt} attempts to {url}"
                        ));
                    }
                    let wait = self.retry_wait * attempt;
                    warn!(%url, attempt, "Rate limited by Meteocat, sleeping for {wait:?}");
                    tokio::time::sleep(wait).await;
                }
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        if attempt > self.max_retries {
                            return Err(anyhow!(
                                "Meteocat request to {url} failed with status {status}: {}",
                                truncate_body(&body)
                            ));
                        }
                        let wait = self.retry_wait * attempt;
                        warn!(%url, %status, attempt, "Request failed, retrying in {wait:?}");
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return response
                        .json::<Value>()
                        .await
                        .with_context(|| format!("Failed to parse Meteocat JSON from {url}"));
                }
                Err(err) => {
                    if attempt > self.max_retries {
                        return Err(err)
                            .with_context(|| format!("Network error talking to Meteocat at {url}"));
                    }
                    let wait = self.retry_wait * attempt;
                    warn!(%url, attempt, "Network error ({err}), retrying in {wait:?}");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[async_trait]
impl ObservationSource for MeteocatClient {
    async fn list_stations(&self, filter: &StationFilter) -> Result<Vec<Value>> {
        MeteocatClient::list_stations(self, filter).await
    }

    async fn daily_statistics(
        &self,
        station_code: &str,
        variable_code: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Value>> {
        self.fetch_daily_variable_statistics(station_code, variable_code, year, month)
            .await
    }

    async fn daily_precipitation(
        &self,
        station_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        variable_code: &str,
    ) -> Result<Vec<DailyValue>> {
        self.fetch_daily_precipitation(station_code, start, end, variable_code)
            .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = MeteocatClient::with_base_url("KEY".into(), "http://localhost:9999/");
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn truncate_body_caps_long_responses() {
        let long = "x".repeat(500);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
