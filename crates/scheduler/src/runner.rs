//! Bounded-concurrency execution of monthly runs, catchup and the daemon loop.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use openfda_storage::{RunLedger, RunRecord, RunStatus, StoreError};

use crate::cron::MonthlySchedule;
use crate::job::MonthlyJob;

/// Ledger-facing summary of one finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub logical_date: NaiveDate,
    pub status: RunStatus,
    pub attempts: u32,
    pub rows_written: u64,
    pub error: Option<String>,
}

pub struct Runner {
    job: Arc<MonthlyJob>,
    ledger: Arc<dyn RunLedger>,
    max_active_runs: usize,
}

impl Runner {
    pub fn new(job: Arc<MonthlyJob>, ledger: Arc<dyn RunLedger>, max_active_runs: usize) -> Self {
        Self {
            job,
            ledger,
            max_active_runs: max_active_runs.max(1),
        }
    }

    /// Run one logical date and record it in the ledger.
    pub async fn run_one(&self, logical_date: NaiveDate) -> RunSummary {
        execute(self.job.clone(), self.ledger.clone(), logical_date).await
    }

    /// Run every date in `logical_dates`, at most `max_active_runs` at a time.
    ///
    /// A failing run does not affect the others. Summaries come back ordered
    /// by logical date.
    pub async fn run_all(&self, logical_dates: Vec<NaiveDate>) -> Vec<RunSummary> {
        if logical_dates.is_empty() {
            return Vec::new();
        }
        info!(
            runs = logical_dates.len(),
            max_active_runs = self.max_active_runs,
            "dispatching monthly runs"
        );

        let permits = Arc::new(Semaphore::new(self.max_active_runs));
        let mut set = JoinSet::new();
        for logical_date in logical_dates {
            let permits = permits.clone();
            let job = self.job.clone();
            let ledger = self.ledger.clone();
            set.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                execute(job, ledger, logical_date).await
            });
        }

        let mut summaries = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(error = %e, "run task panicked or was cancelled"),
            }
        }
        summaries.sort_by_key(|s| s.logical_date);
        summaries
    }

    /// Logical dates from `schedule` that have elapsed and are not yet
    /// recorded as successful. Fails if the ledger cannot be read, since
    /// guessing would re-append months that are already loaded.
    pub async fn pending(&self, schedule: &MonthlySchedule) -> Result<Vec<NaiveDate>, StoreError> {
        let due = schedule.logical_dates(Utc::now());
        let done = self.ledger.completed(schedule.start_date()).await?;
        Ok(due.into_iter().filter(|d| !done.contains(d)).collect())
    }

    /// Run every pending period once.
    pub async fn catchup(&self, schedule: &MonthlySchedule) -> Result<Vec<RunSummary>, StoreError> {
        let pending = self.pending(schedule).await?;
        info!(
            start = %schedule.start_date(),
            pending = pending.len(),
            "catchup"
        );
        Ok(self.run_all(pending).await)
    }

    /// Catch up, then keep waking on each tick (or every `poll_interval`,
    /// whichever comes first) until `shutdown` resolves.
    ///
    /// A period that fails is not retried again until the process restarts.
    pub async fn serve<S>(&self, schedule: &MonthlySchedule, poll_interval: Duration, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut attempted: BTreeSet<NaiveDate> = BTreeSet::new();

        loop {
            match self.pending(schedule).await {
                Ok(pending) => {
                    let pending: Vec<NaiveDate> =
                        pending.into_iter().filter(|d| !attempted.contains(d)).collect();
                    attempted.extend(pending.iter().copied());

                    // Dropping `run_all` aborts its tasks; a run cut short is
                    // not recorded and is picked up again on the next start.
                    let summaries = tokio::select! {
                        summaries = self.run_all(pending) => summaries,
                        _ = &mut shutdown => {
                            info!("scheduler shutdown requested, abandoning in-flight runs");
                            break;
                        }
                    };
                    for summary in summaries {
                        if summary.status == RunStatus::Failed {
                            warn!(
                                logical_date = %summary.logical_date,
                                error = summary.error.as_deref().unwrap_or(""),
                                "run failed, will not be retried until restart"
                            );
                        }
                    }
                }
                Err(e) => warn!(error = %e, "could not read run ledger, skipping this cycle"),
            }

            let now = Utc::now();
            let wait = schedule
                .next_tick(now)
                .and_then(|tick| (tick - now).to_std().ok())
                .map(|until_tick| until_tick.min(poll_interval))
                .unwrap_or(poll_interval);
            debug!(wait_secs = wait.as_secs(), "scheduler sleeping");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    info!("scheduler shutdown requested");
                    break;
                }
            }
        }
    }
}

async fn execute(job: Arc<MonthlyJob>, ledger: Arc<dyn RunLedger>, logical_date: NaiveDate) -> RunSummary {
    let started_at = Utc::now();
    let run = job.run(MonthlySchedule::window_for(logical_date)).await;
    let finished_at = Utc::now();

    let summary = match &run.outcome {
        Ok(report) => RunSummary {
            logical_date,
            status: RunStatus::Success,
            attempts: run.attempts,
            rows_written: report.rows_written,
            error: None,
        },
        Err(e) => RunSummary {
            logical_date,
            status: RunStatus::Failed,
            attempts: run.attempts,
            rows_written: 0,
            error: Some(e.to_string()),
        },
    };

    let record = RunRecord {
        run_id: Uuid::new_v4(),
        logical_date,
        status: summary.status,
        attempts: summary.attempts,
        rows_written: summary.rows_written,
        error: summary.error.clone(),
        started_at,
        finished_at,
    };
    if let Err(e) = ledger.record(&record).await {
        warn!(logical_date = %logical_date, error = %e, "failed to record run in ledger");
    }

    summary
}
