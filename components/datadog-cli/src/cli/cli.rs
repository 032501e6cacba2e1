// Local crates
use crate::{
    helpers::load_config::{DEFAULT_CONFIG_PATH, ProcessEnv},
    instrumentation::tracing::{LogFormat, TelemetryOptions, init_panic_handler, init_tracing},
    runtime::runtime::{SubmissionArgs, run_submission},
    submitter::client::DEFAULT_API_URL,
};

// External crates
use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument::WithSubscriber;

/// Long flags that used to be spelled with a single dash (`-dry-run`, `-tags=...`).
const LEGACY_LONG_FLAGS: [&str; 3] = ["dry-run", "tags", "conf"];

#[derive(Parser, Debug)]
#[command(
    name = "datadog",
    long_about = "Send a single counter or gauge metric to Datadog.\n\n\
        Credentials come from the API_KEY and APP_KEY environment variables, or from a JSON \
        file ({\"api_key\": \"...\", \"app_key\": \"...\"}) that only its owner may read and write (mode 0600).",
    about = "Send a metric to Datadog",
    version,
    term_width = 100,
    after_help = "\
    METRIC TYPES:
        increment, incr, i, counter, c
        gauge, g

    EXAMPLES:
        datadog increment mycompany.mymetric 101.2
        datadog --tags=dc:us-east-1,env:prod gauge mycompany.temp 98.6
        datadog --dry-run --conf=/opt/mycompany/creds/datadogrc g mycompany.queue_depth 12 -3"
)]
struct Cli {
    /// Don't send data to Datadog, print the metric on stderr instead
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    dry_run: bool,

    /// Tags to add to this metric, e.g. 'key:value,key2:value2'
    #[arg(long, default_value = "")]
    tags: String,

    /// JSON file holding the Datadog api and app keys
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    conf: String,

    /// Datadog API base URL
    #[arg(long, value_name = "URL", env = "DATADOG_HOST", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// HTTP request timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Metric type, metric name and one or more values
    #[arg(value_name = "TYPE METRIC VALUE", allow_negative_numbers = true)]
    args: Vec<String>,
}

impl Cli {
    fn telemetry_options(&self) -> TelemetryOptions {
        TelemetryOptions {
            verbosity: self.verbose,
            format: self.log_format,
            log_file: self.log_file.clone(),
        }
    }

    fn into_submission_args(self) -> SubmissionArgs {
        SubmissionArgs {
            positional: self.args,
            tags: self.tags,
            config_path: self.conf,
            dry_run: self.dry_run,
            api_url: self.api_url,
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// Rewrite single-dash long flags (`-dry-run`, `-tags=x`, `-conf x`) to their
/// double-dash form so existing scripts keep working.
///
/// Everything after a `--` separator is left alone.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut after_separator = false;

    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if after_separator {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                after_separator = true;
                return arg;
            }

            let is_legacy = text.strip_prefix('-').is_some_and(|flag| {
                !flag.starts_with('-')
                    && LEGACY_LONG_FLAGS.iter().any(|name| {
                        flag.strip_prefix(name)
                            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
                    })
            });

            if is_legacy {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

/// Entry function for CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));

    let telemetry = init_tracing(&cli.telemetry_options())?;
    init_panic_handler(telemetry.dispatch().clone());

    let dispatch = telemetry.dispatch().clone();
    run_submission(
        cli.into_submission_args(),
        ProcessEnv,
        dispatch.clone(),
        &mut std::io::stderr(),
    )
    .with_subscriber(dispatch)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_legacy_flags(args.iter().copied())).unwrap()
    }

    #[test]
    fn legacy_flags_are_normalized() {
        let normalized = normalize_legacy_flags([
            "datadog",
            "-dry-run",
            "-tags=dc:us-east-1,env:prod",
            "-conf",
            "/opt/creds",
            "-v",
            "--tags=x",
            "-tagsx",
            "--",
            "-conf",
        ]);

        assert_eq!(
            normalized,
            [
                "datadog",
                "--dry-run",
                "--tags=dc:us-east-1,env:prod",
                "--conf",
                "/opt/creds",
                "-v",
                "--tags=x",
                "-tagsx",
                "--",
                "-conf",
            ]
            .map(OsString::from)
        );
    }

    #[test]
    fn parses_legacy_invocation() {
        let cli = parse(&[
            "datadog",
            "-dry-run",
            "-tags=project:glory",
            "-conf=/tmp/creds.json",
            "gauge",
            "vsco.my_metric",
            "58.274",
        ]);

        assert!(cli.dry_run);
        assert_eq!(cli.tags, "project:glory");
        assert_eq!(cli.conf, "/tmp/creds.json");
        assert_eq!(cli.args, ["gauge", "vsco.my_metric", "58.274"]);
    }

    #[test]
    fn dry_run_accepts_explicit_boolean() {
        let cli = parse(&["datadog", "-dry-run=true", "g", "m", "1"]);
        assert!(cli.dry_run);
        assert_eq!(cli.args, ["g", "m", "1"]);

        let cli = parse(&["datadog", "-dry-run=false", "g", "m", "1"]);
        assert!(!cli.dry_run);

        let cli = parse(&["datadog", "--dry-run", "g", "m", "1"]);
        assert!(cli.dry_run);
        assert_eq!(cli.args, ["g", "m", "1"]);
    }

    #[test]
    fn negative_values_are_positional() {
        let cli = parse(&["datadog", "g", "vsco.my_metric", "58.274", "-0.242", "-3"]);
        assert_eq!(cli.args, ["g", "vsco.my_metric", "58.274", "-0.242", "-3"]);
    }

    #[test]
    fn defaults_apply() {
        let cli = parse(&["datadog", "incr", "m", "1"]);

        assert!(!cli.dry_run);
        assert_eq!(cli.tags, "");
        assert_eq!(cli.conf, "~/.datadogrc");
        assert_eq!(cli.timeout, 60);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn missing_positional_args_reach_the_parser() {
        let cli = parse(&["datadog", "gauge"]);
        assert_eq!(cli.args, ["gauge"]);
    }

    #[test]
    fn submission_args_carry_flags() {
        let args = parse(&[
            "datadog",
            "--dry-run",
            "--timeout",
            "5",
            "--api-url",
            "http://localhost:8080",
            "c",
            "m",
            "1",
        ])
        .into_submission_args();

        assert!(args.dry_run);
        assert_eq!(args.timeout, Duration::from_secs(5));
        assert_eq!(args.api_url, "http://localhost:8080");
        assert_eq!(args.config_path, "~/.datadogrc");
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(parse(&["datadog", "-vv", "g", "m", "1"]).verbose, 2);
    }
}
