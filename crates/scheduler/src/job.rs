//! One monthly run: fetch-and-aggregate, then persist.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use openfda_core::{QueryWindow, DATASET_KEY};
use openfda_ingest::{FetchError, WeeklySource};
use openfda_storage::{persist_weekly, StoreError, WeeklySink};

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("fetch step failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("persist step failed: {0}")]
    Persist(#[from] StoreError),
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub weeks: usize,
    pub total: i64,
    pub rows_written: u64,
}

/// Result of one run, successful or not.
#[derive(Debug)]
pub struct JobRun {
    pub window: QueryWindow,
    /// Step attempts across both steps, retries included.
    pub attempts: u32,
    pub outcome: Result<RunReport, JobError>,
}

/// The two-step job, each step retried independently.
pub struct MonthlyJob {
    source: Arc<dyn WeeklySource>,
    sink: Arc<dyn WeeklySink>,
    retry: RetryPolicy,
}

impl MonthlyJob {
    pub fn new(source: Arc<dyn WeeklySource>, sink: Arc<dyn WeeklySink>, retry: RetryPolicy) -> Self {
        Self { source, sink, retry }
    }

    pub async fn run(&self, window: QueryWindow) -> JobRun {
        info!(
            year = window.year(),
            month = window.month(),
            source = self.source.source_name(),
            sink = self.sink.sink_name(),
            "run started"
        );

        let (fetched, fetch_attempts) = self
            .retry
            .run("fetch", || self.source.fetch_weekly(window))
            .await;
        let columns = match fetched {
            Ok(columns) => columns,
            Err(e) => {
                error!(year = window.year(), month = window.month(), error = %e, "fetch step failed");
                return JobRun {
                    window,
                    attempts: fetch_attempts,
                    outcome: Err(e.into()),
                };
            }
        };

        let (persisted, persist_attempts) = self
            .retry
            .run("persist", || persist_weekly(self.sink.as_ref(), &columns))
            .await;
        let attempts = fetch_attempts + persist_attempts;

        let outcome = match persisted {
            Ok(rows_written) => {
                info!(
                    year = window.year(),
                    month = window.month(),
                    dataset = DATASET_KEY,
                    weeks = columns.len(),
                    rows = rows_written,
                    "run finished"
                );
                Ok(RunReport {
                    weeks: columns.len(),
                    total: columns.total(),
                    rows_written,
                })
            }
            Err(e) => {
                error!(year = window.year(), month = window.month(), error = %e, "persist step failed");
                Err(e.into())
            }
        };

        JobRun { window, attempts, outcome }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use openfda_core::{WeeklyAggregate, WeeklyColumns};
    use openfda_storage::MemorySink;

    use super::*;

    /// Fails `failures` times, then returns `columns`.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
        columns: WeeklyColumns,
    }

    #[async_trait]
    impl WeeklySource for FlakySource {
        async fn fetch_weekly(&self, _window: QueryWindow) -> Result<WeeklyColumns, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(FetchError::Decode("truncated body".into()));
            }
            Ok(self.columns.clone())
        }

        fn source_name(&self) -> &str {
            "flaky"
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl WeeklySink for BrokenSink {
        async fn append(&self, _rows: &[WeeklyAggregate]) -> Result<u64, StoreError> {
            Err(StoreError::InvalidTable("gone".into()))
        }

        fn sink_name(&self) -> &str {
            "broken"
        }
    }

    fn scenario() -> WeeklyColumns {
        WeeklyColumns {
            time: vec!["2021-01-03".into(), "2021-01-10".into()],
            count: vec![8, 2],
        }
    }

    fn january() -> QueryWindow {
        QueryWindow::new(2021, 1).unwrap()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(1, Duration::ZERO)
    }

    #[tokio::test]
    async fn fetch_then_persist() {
        let source = Arc::new(FlakySource { failures: 0, calls: AtomicU32::new(0), columns: scenario() });
        let sink = Arc::new(MemorySink::new());
        let job = MonthlyJob::new(source, sink.clone(), fast_retry());

        let run = job.run(january()).await;
        let report = run.outcome.unwrap();
        assert_eq!(report, RunReport { weeks: 2, total: 10, rows_written: 2 });
        assert_eq!(run.attempts, 2);
        assert_eq!(sink.rows().len(), 2);
    }

    #[tokio::test]
    async fn empty_fetch_writes_nothing() {
        let source = Arc::new(FlakySource {
            failures: 0,
            calls: AtomicU32::new(0),
            columns: WeeklyColumns::empty(),
        });
        let sink = Arc::new(MemorySink::new());
        let job = MonthlyJob::new(source, sink.clone(), fast_retry());

        let report = job.run(january()).await.outcome.unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(sink.append_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_retry_recovers() {
        let source = Arc::new(FlakySource { failures: 1, calls: AtomicU32::new(0), columns: scenario() });
        let sink = Arc::new(MemorySink::new());
        let job = MonthlyJob::new(source.clone(), sink.clone(), fast_retry());

        let run = job.run(january()).await;
        assert!(run.outcome.is_ok());
        assert_eq!(run.attempts, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sink.rows().len(), 2);
    }

    #[tokio::test]
    async fn persistent_fetch_failure_skips_persist() {
        let source = Arc::new(FlakySource { failures: 5, calls: AtomicU32::new(0), columns: scenario() });
        let sink = Arc::new(MemorySink::new());
        let job = MonthlyJob::new(source, sink.clone(), fast_retry());

        let run = job.run(january()).await;
        assert!(matches!(run.outcome, Err(JobError::Fetch(_))));
        assert_eq!(run.attempts, 2);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn persist_failure_is_reported() {
        let source = Arc::new(FlakySource { failures: 0, calls: AtomicU32::new(0), columns: scenario() });
        let job = MonthlyJob::new(source, Arc::new(BrokenSink), fast_retry());

        let run = job.run(january()).await;
        assert!(matches!(run.outcome, Err(JobError::Persist(_))));
        assert_eq!(run.attempts, 3);
    }
}
