//! Wires config into the job, ledger and runner.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use openfda_core::Config;
use openfda_ingest::OpenFdaClient;
use openfda_scheduler::{parse_duration, MonthlyJob, MonthlySchedule, RetryPolicy, Runner};
use openfda_storage::{
    init_pg_pool, MemoryLedger, MemorySink, PgRunLedger, PgWeeklyStore, RunLedger, WeeklySink,
};

pub struct Pipeline {
    pub runner: Runner,
    /// Set in dry-run mode: where the rows went instead of PostgreSQL.
    pub memory: Option<Arc<MemorySink>>,
}

impl Pipeline {
    pub async fn build(config: &Config, dry_run: bool) -> Result<Self> {
        let client = OpenFdaClient::new(&config.openfda).context("failed to build HTTP client")?;

        let retry_delay = parse_duration(&config.schedule.retry_delay)
            .context("invalid SCHEDULE_RETRY_DELAY")?;
        let retry = RetryPolicy::new(config.schedule.retries, retry_delay);

        let sink: Arc<dyn WeeklySink>;
        let ledger: Arc<dyn RunLedger>;
        let mut memory = None;
        if dry_run {
            info!("dry run: rows are kept in memory");
            let memory_sink = Arc::new(MemorySink::new());
            sink = memory_sink.clone();
            ledger = Arc::new(MemoryLedger::new());
            memory = Some(memory_sink);
        } else {
            let pool = init_pg_pool(&config.postgres)
                .await
                .context("failed to connect to PostgreSQL")?;
            let store = PgWeeklyStore::new(pool.clone(), &config.postgres.table)?;
            store.ensure_table().await.context("failed to create destination table")?;
            sink = Arc::new(store);
            ledger = Arc::new(PgRunLedger::new(pool));
        }

        let job = MonthlyJob::new(Arc::new(client), sink, retry);
        let runner = Runner::new(Arc::new(job), ledger, config.schedule.max_active_runs);
        Ok(Self { runner, memory })
    }

    /// Print dry-run rows as the column-oriented JSON handed to the persist step.
    pub fn print_memory(&self) -> Result<()> {
        if let Some(memory) = &self.memory {
            let columns = openfda_core::WeeklyColumns::from_rows(&memory.rows());
            println!("{}", serde_json::to_string_pretty(&columns)?);
        }
        Ok(())
    }
}

pub fn schedule(config: &Config, start_override: Option<chrono::NaiveDate>) -> Result<MonthlySchedule> {
    let start = start_override.unwrap_or(config.schedule.start_date);
    MonthlySchedule::new(&config.schedule.cron, start).context("invalid SCHEDULE_CRON")
}
