//! Persistence: append weekly aggregates to PostgreSQL and keep a ledger of
//! finished runs.

pub mod db;
pub mod error;
pub mod ledger;
pub mod sink;

pub use db::init_pg_pool;
pub use error::StoreError;
pub use ledger::{MemoryLedger, PgRunLedger, RunLedger, RunRecord, RunStatus};
pub use sink::{persist_weekly, MemorySink, PgWeeklyStore, WeeklySink};
