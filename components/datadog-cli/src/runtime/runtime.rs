// Local crates
use crate::{
    helpers::{
        clock::SystemClock,
        load_config::{CredentialResolver, EnvSource},
    },
    parser::parser::MetricParser,
    submitter::submitter::Submitter,
};

// External crates
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;
use tracing::{Dispatch, instrument};

/// Everything one invocation needs, already pulled out of the command line.
#[derive(Debug, Clone)]
pub struct SubmissionArgs {
    /// `TYPE METRIC VALUE...`
    pub positional: Vec<String>,
    pub tags: String,
    pub config_path: String,
    pub dry_run: bool,
    pub api_url: String,
    pub timeout: Duration,
}

/// Resolve credentials, parse the metric and submit it.
///
/// Credential resolution does blocking file I/O, so it runs on the blocking
/// pool while the positional arguments are parsed. Its result is only awaited
/// right before submission; a parse failure is reported without waiting.
#[instrument(
    name = "datadog_runtime::run_submission",
    target = "runtime::runtime",
    skip_all,
    fields(dry_run = args.dry_run),
    level = "debug"
)]
pub async fn run_submission<E, W>(
    args: SubmissionArgs,
    env: E,
    dispatch: Dispatch,
    diagnostics: &mut W,
) -> Result<()>
where
    E: EnvSource + Send + 'static,
    W: Write,
{
    let resolver = CredentialResolver::new(args.config_path.clone(), env);
    let credentials_task = tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || resolver.resolve())
    });

    let metric = MetricParser::new(SystemClock)
        .parse(&args.positional, &args.tags)
        .context("invalid metric submission")?;

    let credentials = credentials_task
        .await
        .context("credential resolution task did not complete")?
        .context("failed to resolve Datadog credentials")?;

    tracing::info!(
        metric_name = %metric.name,
        metric_type = %metric.metric_type,
        points = metric.points.len(),
        "Submitting metric"
    );

    Submitter::new(args.api_url, args.timeout)
        .submit(metric, credentials, args.dry_run, diagnostics)
        .await
        .context("failed to submit metric")?;

    Ok(())
}
