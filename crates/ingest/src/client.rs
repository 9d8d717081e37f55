//! openFDA count-endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use openfda_core::config::OpenFdaConfig;
use openfda_core::{QueryWindow, RawReport, WeeklyColumns};

use crate::aggregate::aggregate_weekly;
use crate::query::query_url;
use crate::traits::{FetchError, WeeklySource};

/// Fetches report counts for one drug from the openFDA adverse-event API.
#[derive(Debug, Clone)]
pub struct OpenFdaClient {
    client: Client,
    base_url: String,
    drug: String,
    count_field: String,
}

#[derive(Deserialize)]
struct CountResponse {
    results: Vec<CountBucket>,
}

#[derive(Deserialize)]
struct CountBucket {
    time: String,
    count: u64,
}

impl OpenFdaClient {
    pub fn new(config: &OpenFdaConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build around an existing HTTP client (shared connection pool).
    pub fn with_client(client: Client, config: &OpenFdaConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            drug: config.drug.clone(),
            count_field: config.count_field.clone(),
        }
    }

    pub fn url_for(&self, window: QueryWindow) -> String {
        query_url(&self.base_url, &self.drug, window, &self.count_field)
    }

    /// One GET for `window`. `None` when the API answered anything but 200.
    pub async fn fetch_reports(&self, window: QueryWindow) -> Result<Option<Vec<RawReport>>, FetchError> {
        let url = self.url_for(window);
        debug!(%url, "querying openFDA");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                year = window.year(),
                month = window.month(),
                %status,
                "openFDA returned non-200, treating period as empty"
            );
            return Ok(None);
        }

        let body = response.text().await?;
        parse_reports(&body).map(Some)
    }
}

/// Decode a 200 body into raw reports.
pub(crate) fn parse_reports(body: &str) -> Result<Vec<RawReport>, FetchError> {
    let parsed: CountResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    parsed
        .results
        .into_iter()
        .map(|bucket| {
            Ok(RawReport {
                time: parse_report_date(&bucket.time)?,
                count: bucket.count,
            })
        })
        .collect()
}

/// The count endpoint emits `YYYYMMDD`; ISO dates are accepted as well.
fn parse_report_date(raw: &str) -> Result<NaiveDate, FetchError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| FetchError::InvalidDate(raw.to_string()))
}

#[async_trait]
impl WeeklySource for OpenFdaClient {
    async fn fetch_weekly(&self, window: QueryWindow) -> Result<WeeklyColumns, FetchError> {
        let Some(reports) = self.fetch_reports(window).await? else {
            return Ok(WeeklyColumns::empty());
        };

        let weeks = aggregate_weekly(&reports);
        let columns = WeeklyColumns::from_rows(&weeks);
        info!(
            year = window.year(),
            month = window.month(),
            buckets = reports.len(),
            weeks = columns.len(),
            total = columns.total(),
            "aggregated openFDA reports by week"
        );
        if let Some((time, count)) = columns.time.first().zip(columns.count.first()) {
            debug!(first_week = %time, first_count = count, "weekly aggregate head");
        }
        Ok(columns)
    }

    fn source_name(&self) -> &str {
        "openfda"
    }
}
