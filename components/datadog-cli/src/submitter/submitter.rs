//! Submitter - responsibility and behavior
//!
//! The Submitter is the last step of an invocation. It takes an
//! *already-validated* [`Metric`] and either:
//! - dry run: writes the metric as a single JSON line to the diagnostic
//! stream and performs no network I/O, or
//! - live run: builds a [`DatadogClient`] from the resolved keys and posts a
//! single-element series.
//!
//! There is no retry, batching or buffering here. One metric, one request,
//! and any failure is surfaced to the caller as a [`SubmissionError`].

// Local crates
use crate::helpers::load_config::Credentials;
use crate::parser::models::Metric;
use crate::submitter::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT, DatadogClient};

// External crates
use std::io::Write;
use std::time::Duration;
use tracing::instrument;

/// Submission error handling
/// - Everything that can go wrong once the input is known to be valid.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("failed to serialize metric: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write dry run output: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to build Datadog API client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("failed to post metrics to {url}: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("Datadog API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Where and how a live submission is sent.
#[derive(Debug, Clone)]
pub struct Submitter {
    api_url: String,
    timeout: Duration,
}

impl Default for Submitter {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_TIMEOUT)
    }
}

impl Submitter {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            timeout,
        }
    }

    /// Deliver `metric`, or only print it when `dry_run` is set.
    ///
    /// `diagnostics` receives the dry run JSON line; the binary passes stderr.
    #[instrument(
        name = "datadog_submitter::submit",
        target = "submitter::submitter::Submitter",
        skip_all,
        fields(metric_name = %metric.name, dry_run = dry_run),
        level = "debug"
    )]
    pub async fn submit<W: Write>(
        &self,
        metric: Metric,
        credentials: Credentials,
        dry_run: bool,
        diagnostics: &mut W,
    ) -> Result<(), SubmissionError> {
        if dry_run {
            tracing::debug!("Dry run requested, writing metric to diagnostic stream");
            return write_dry_run(&metric, diagnostics);
        }

        let client = DatadogClient::new(credentials, &self.api_url, self.timeout)?;
        client.post_metrics(std::slice::from_ref(&metric)).await
    }
}

/// Write the metric as one JSON line.
pub fn write_dry_run<W: Write>(metric: &Metric, out: &mut W) -> Result<(), SubmissionError> {
    let encoded = serde_json::to_string(metric)?;
    writeln!(out, "{encoded}")?;
    out.flush()?;
    Ok(())
}
