mod cli;
mod pipeline;

use anyhow::{bail, Context, Result};
use chrono::{NaiveTime, TimeZone, Utc};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use openfda_core::config::{load_dotenv, Config};
use openfda_core::QueryWindow;
use openfda_ingest::OpenFdaClient;
use openfda_scheduler::{parse_duration, RunSummary};
use openfda_storage::RunStatus;

use crate::cli::{CliArgs, Command};
use crate::pipeline::{schedule, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env();

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        }

        Command::Url { month } => {
            let window = QueryWindow::new(month.year, month.month)?;
            let client = OpenFdaClient::new(&config.openfda)?;
            println!("{}", client.url_for(window));
        }

        Command::Run { month, dry_run } => {
            config.log_summary();
            let window = QueryWindow::new(month.year, month.month)?;
            let pipeline = Pipeline::build(&config, dry_run).await?;
            let summary = pipeline.runner.run_one(window.start()).await;
            pipeline.print_memory()?;
            report(&[summary])?;
        }

        Command::Backfill { from, until, force, dry_run } => {
            config.log_summary();
            let schedule = schedule(&config, from)?;
            let pipeline = Pipeline::build(&config, dry_run).await?;

            let until = until
                .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
                .unwrap_or_else(Utc::now);
            let due = schedule.logical_dates(until);
            let dates = if force {
                due
            } else {
                let pending = pipeline
                    .runner
                    .pending(&schedule)
                    .await
                    .context("failed to read run ledger")?;
                due.into_iter().filter(|d| pending.contains(d)).collect()
            };

            let summaries = pipeline.runner.run_all(dates).await;
            pipeline.print_memory()?;
            report(&summaries)?;
        }

        Command::Serve { dry_run } => {
            config.log_summary();
            let schedule = schedule(&config, None)?;
            let poll = parse_duration(&config.schedule.poll_interval)
                .context("invalid SCHEDULE_POLL_INTERVAL")?;
            let pipeline = Pipeline::build(&config, dry_run).await?;

            info!(cron = schedule.expression(), start = %schedule.start_date(), "scheduler started");
            pipeline
                .runner
                .serve(&schedule, poll, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
            pipeline.print_memory()?;
        }
    }

    Ok(())
}

/// Load `.env`, then build the log filter from `RUST_LOG` (default `info`).
///
/// `.env` must be loaded first so a `RUST_LOG` set there takes effect.
fn log_filter() -> EnvFilter {
    load_dotenv();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log per-run outcomes; fail the process if any run failed.
fn report(summaries: &[RunSummary]) -> Result<()> {
    let mut failed = 0;
    for s in summaries {
        match s.status {
            RunStatus::Success => info!(
                logical_date = %s.logical_date,
                rows = s.rows_written,
                attempts = s.attempts,
                "run succeeded"
            ),
            RunStatus::Failed => {
                failed += 1;
                warn!(
                    logical_date = %s.logical_date,
                    attempts = s.attempts,
                    error = s.error.as_deref().unwrap_or(""),
                    "run failed"
                );
            }
        }
    }
    info!(runs = summaries.len(), failed, "done");
    if failed > 0 {
        bail!("{failed} of {} runs failed", summaries.len());
    }
    Ok(())
}
