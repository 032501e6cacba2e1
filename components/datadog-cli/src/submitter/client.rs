//! Minimal Datadog metrics client.
//!
//! Only the one call this tool needs: posting a list of metrics to the v1
//! series endpoint. Authentication uses the `DD-API-KEY` /
//! `DD-APPLICATION-KEY` headers.

// Local crates
use crate::helpers::load_config::Credentials;
use crate::parser::models::Metric;
use crate::submitter::submitter::SubmissionError;

// External crates
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

/// Public Datadog API host, used unless `--api-url` / `DATADOG_HOST` says otherwise.
pub const DEFAULT_API_URL: &str = "https://api.datadoghq.com";
/// Series submission path, relative to the API base URL.
pub const SERIES_PATH: &str = "/api/v1/series";
/// Request timeout used when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_HEADER: &str = "DD-API-KEY";
const APP_KEY_HEADER: &str = "DD-APPLICATION-KEY";

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: &'a [Metric],
}

/// Datadog API client bound to one pair of keys.
#[derive(Debug)]
pub struct DatadogClient {
    http: reqwest::Client,
    series_url: String,
    credentials: Credentials,
}

impl DatadogClient {
    pub fn new(
        credentials: Credentials,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, SubmissionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("datadog-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SubmissionError::ClientBuild)?;

        Ok(Self {
            http,
            series_url: format!("{}{SERIES_PATH}", api_url.trim_end_matches('/')),
            credentials,
        })
    }

    /// Post metrics in a single request.
    ///
    /// Any non-2xx answer is returned as [`SubmissionError::Rejected`] with the
    /// body Datadog sent back.
    #[instrument(
        name = "datadog_client::post_metrics",
        target = "submitter::client::DatadogClient",
        skip_all,
        level = "debug"
    )]
    pub async fn post_metrics(&self, series: &[Metric]) -> Result<(), SubmissionError> {
        tracing::debug!(
            series_url = %self.series_url,
            series_len = series.len(),
            "Posting metrics to Datadog"
        );

        let body = serde_json::to_vec(&SeriesPayload { series }).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to encode metrics payload");
        })?;

        let response = self
            .http
            .post(&self.series_url)
            .header(API_KEY_HEADER, self.credentials.api_key())
            .header(APP_KEY_HEADER, self.credentials.app_key())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| {
                tracing::error!(
                    series_url = %self.series_url,
                    error = %source,
                    "Failed to send metrics to Datadog"
                );
                SubmissionError::Transport {
                    url: self.series_url.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read Datadog error response body");
                String::new()
            });
            tracing::error!(
                status = %status,
                response_body = %body,
                "Datadog rejected metrics submission"
            );
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(status = %status, "Metrics accepted by Datadog");
        Ok(())
    }
}
