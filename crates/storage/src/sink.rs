//! Append-only destination for weekly aggregates.
//!
//! Rows are never upserted or deduplicated: persisting the same month twice
//! leaves two copies of every week.

use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use openfda_core::{WeeklyAggregate, WeeklyColumns};

use crate::error::StoreError;

/// Destination for weekly rows.
#[async_trait]
pub trait WeeklySink: Send + Sync {
    /// Append `rows`, returning how many were written.
    async fn append(&self, rows: &[WeeklyAggregate]) -> Result<u64, StoreError>;

    /// Human-readable name for logs.
    fn sink_name(&self) -> &str;
}

/// Persist step: append `columns` to `sink`. Empty input is a no-op.
pub async fn persist_weekly(sink: &dyn WeeklySink, columns: &WeeklyColumns) -> Result<u64, StoreError> {
    if columns.is_empty() {
        debug!(sink = sink.sink_name(), "no weekly data, nothing to persist");
        return Ok(0);
    }

    let rows = columns.to_rows()?;
    let written = sink.append(&rows).await?;
    info!(sink = sink.sink_name(), rows = written, "weekly aggregate appended");
    Ok(written)
}

// ── PostgreSQL ───────────────────────────────────────────────────────

/// Appends rows to a `(time TEXT, count BIGINT)` table.
#[derive(Debug, Clone)]
pub struct PgWeeklyStore {
    pool: PgPool,
    table: String,
}

impl PgWeeklyStore {
    /// `table` must be a plain (optionally schema-qualified) identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        if !is_plain_identifier(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Create the destination table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\"time\" TEXT, \"count\" BIGINT)",
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl WeeklySink for PgWeeklyStore {
    async fn append(&self, rows: &[WeeklyAggregate]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (\"time\", \"count\") ", self.table));
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.time.clone()).push_bind(row.count);
        });

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    fn sink_name(&self) -> &str {
        &self.table
    }
}

/// `name` or `schema.name`, ASCII letters/digits/underscore, no leading digit.
fn is_plain_identifier(table: &str) -> bool {
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        part.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

// ── In-memory ────────────────────────────────────────────────────────

/// Collects appended rows in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<WeeklyAggregate>>,
    appends: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row appended so far.
    pub fn rows(&self) -> Vec<WeeklyAggregate> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of `append` calls that wrote at least one row.
    pub fn append_calls(&self) -> usize {
        *self.appends.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WeeklySink for MemorySink {
    async fn append(&self, rows: &[WeeklyAggregate]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(rows);
        *self.appends.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(rows.len() as u64)
    }

    fn sink_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> WeeklyColumns {
        WeeklyColumns {
            time: vec!["2021-01-03".into(), "2021-01-10".into()],
            count: vec![8, 2],
        }
    }

    #[tokio::test]
    async fn empty_input_writes_nothing() {
        let sink = MemorySink::new();
        let written = persist_weekly(&sink, &WeeklyColumns::empty()).await.unwrap();
        assert_eq!(written, 0);
        assert_eq!(sink.append_calls(), 0);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn appends_exactly_the_weekly_rows() {
        let sink = MemorySink::new();
        let written = persist_weekly(&sink, &scenario()).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            sink.rows(),
            vec![
                WeeklyAggregate { time: "2021-01-03".into(), count: 8 },
                WeeklyAggregate { time: "2021-01-10".into(), count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn rerun_duplicates_rows() {
        let sink = MemorySink::new();
        persist_weekly(&sink, &scenario()).await.unwrap();
        persist_weekly(&sink, &scenario()).await.unwrap();
        let rows = sink.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], rows[2]);
        assert_eq!(sink.append_calls(), 2);
    }

    #[tokio::test]
    async fn mismatched_columns_fail() {
        let sink = MemorySink::new();
        let cols = WeeklyColumns {
            time: vec!["2021-01-03".into()],
            count: vec![1, 2],
        };
        let err = persist_weekly(&sink, &cols).await.unwrap_err();
        assert!(matches!(err, StoreError::Payload(_)));
        assert!(sink.rows().is_empty());
    }

    #[test]
    fn table_names() {
        assert!(is_plain_identifier("openfda_data"));
        assert!(is_plain_identifier("analytics.openfda_data"));
        assert!(is_plain_identifier("_t1"));
        assert!(!is_plain_identifier("1table"));
        assert!(!is_plain_identifier("openfda_data; DROP TABLE x"));
        assert!(!is_plain_identifier("a.b.c"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("weird-name"));
    }
}
