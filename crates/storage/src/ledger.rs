//! Record of finished monthly runs, consulted by catchup.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one monthly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    /// First day of the month the run covers.
    pub logical_date: NaiveDate,
    pub status: RunStatus,
    /// Total step attempts, retries included.
    pub attempts: u32,
    pub rows_written: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Logical dates at or after `since` with at least one successful run.
    async fn completed(&self, since: NaiveDate) -> Result<BTreeSet<NaiveDate>, StoreError>;

    async fn record(&self, record: &RunRecord) -> Result<(), StoreError>;
}

// ── PostgreSQL ───────────────────────────────────────────────────────

/// Ledger backed by the `pipeline_runs` table.
#[derive(Debug, Clone)]
pub struct PgRunLedger {
    pool: PgPool,
}

impl PgRunLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLedger for PgRunLedger {
    async fn completed(&self, since: NaiveDate) -> Result<BTreeSet<NaiveDate>, StoreError> {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT DISTINCT logical_date FROM pipeline_runs
             WHERE status = 'success' AND logical_date >= $1",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(dates.into_iter().collect())
    }

    async fn record(&self, record: &RunRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO pipeline_runs
                 (run_id, logical_date, status, attempts, rows_written, error, started_at, finished_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.run_id)
        .bind(record.logical_date)
        .bind(record.status.as_str())
        .bind(i32::try_from(record.attempts).unwrap_or(i32::MAX))
        .bind(i64::try_from(record.rows_written).unwrap_or(i64::MAX))
        .bind(record.error.as_deref())
        .bind(record.started_at)
        .bind(record.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ── In-memory ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<RunRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RunRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RunLedger for MemoryLedger {
    async fn completed(&self, since: NaiveDate) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.status == RunStatus::Success && r.logical_date >= since)
            .map(|r| r.logical_date)
            .collect())
    }

    async fn record(&self, record: &RunRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}
