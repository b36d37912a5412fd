//! `surety` -- submit and monitor provisioning simulations.
//!
//! Validates the two CSV inputs, submits a simulation job to the backend,
//! follows it to completion and prints results and chart series as JSON.
//! `compare` runs both methods on the same files side by side.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default     | Description                          |
//! |-------------------------------|----------|-------------|--------------------------------------|
//! | `SURETY_API_URL`              | yes*     | --          | Backend base URL, e.g. `http://host:8000/api` |
//! | `SURETY_API_TOKEN`            | no       | --          | Sent as `Authorization: Token <token>` |
//! | `SURETY_REQUEST_TIMEOUT_SECS` | no       | `30`        | Per-request HTTP timeout             |
//! | `SURETY_POLL_INTERVAL_SECS`   | no       | `5`         | Seconds between status queries       |
//! | `SURETY_RETRY_DELAY_SECS`     | no       | `5`         | Seconds before retrying a failed query |
//! | `SURETY_PROGRESS_INCREMENT`   | no       | `5`         | Percent added per `running` report   |
//! | `SURETY_PROGRESS_CEILING`     | no       | `85`        | Highest percent before completion    |
//! | `SURETY_MAX_POLL_FAILURES`    | no       | unbounded   | Consecutive failures before giving up |
//! | `SURETY_LOG_FORMAT`           | no       | `text`      | `json` for structured log lines      |
//! | `RUST_LOG`                    | no       | `surety_cli=info,surety_client=info` | Log filter |
//!
//! \* Not needed by the local `validate` and `preview` commands.

use std::process::ExitCode;

use clap::Parser;
use surety_cli::cli::Cli;
use surety_cli::commands;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("SURETY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surety_cli=info,surety_client=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let cli = Cli::parse();

    let output = match commands::run(cli.command).await {
        Ok(output) => output,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "Command failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to render output");
            ExitCode::FAILURE
        }
    }
}
