//! `datadog` - send a single counter or gauge metric to Datadog from the command line.
//!
//! ```text
//! datadog [--dry-run] [--tags=k:v,k2:v2] [--conf=PATH] TYPE METRIC VALUE...
//! ```
//!
//! Keys are read from `API_KEY` / `APP_KEY`, falling back to a `0600` JSON
//! file (`~/.datadogrc` by default).

mod cli;
mod helpers;
mod instrumentation;
mod parser;
mod runtime;
mod submitter;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Main entrypoint simply delegates control to CLI layer.
    // The CLI parses arguments, sets up logging and then runs the submission.
    cli::cli::run().await
}
