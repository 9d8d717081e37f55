//! PostgreSQL round trips. Require a live database:
//! `PG_URL=postgres://... cargo test -p openfda-storage -- --ignored`

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use openfda_core::config::PostgresConfig;
use openfda_core::{Config, WeeklyColumns};
use openfda_storage::{
    init_pg_pool, persist_weekly, PgRunLedger, PgWeeklyStore, RunLedger, RunRecord, RunStatus,
};

fn pg_config() -> Option<PostgresConfig> {
    let cfg = Config::from_env().postgres;
    cfg.url.is_some().then_some(cfg)
}

#[tokio::test]
#[ignore]
async fn append_twice_duplicates_rows() {
    let Some(cfg) = pg_config() else { return };
    let pool = init_pg_pool(&cfg).await.unwrap();

    let table = format!("openfda_test_{}", Uuid::new_v4().simple());
    let store = PgWeeklyStore::new(pool.clone(), &table).unwrap();
    store.ensure_table().await.unwrap();

    let cols = WeeklyColumns {
        time: vec!["2021-01-03".into(), "2021-01-10".into()],
        count: vec![8, 2],
    };
    assert_eq!(persist_weekly(&store, &cols).await.unwrap(), 2);
    assert_eq!(persist_weekly(&store, &cols).await.unwrap(), 2);
    assert_eq!(persist_weekly(&store, &WeeklyColumns::empty()).await.unwrap(), 0);

    let (rows, total): (i64, Option<i64>) =
        sqlx::query_as(&format!("SELECT COUNT(*), SUM(\"count\")::BIGINT FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 4);
    assert_eq!(total, Some(20));

    sqlx::query(&format!("DROP TABLE {table}")).execute(&pool).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn ledger_reports_successful_months() {
    let Some(cfg) = pg_config() else { return };
    let pool = init_pg_pool(&cfg).await.unwrap();
    let ledger = PgRunLedger::new(pool.clone());

    // Far-future date keeps this test away from real rows.
    let logical_date = NaiveDate::from_ymd_opt(2999, 1, 1).unwrap();
    let now = Utc::now();
    let record = RunRecord {
        run_id: Uuid::new_v4(),
        logical_date,
        status: RunStatus::Success,
        attempts: 1,
        rows_written: 2,
        error: None,
        started_at: now,
        finished_at: now,
    };
    ledger.record(&record).await.unwrap();

    let done = ledger.completed(logical_date).await.unwrap();
    assert!(done.contains(&logical_date));

    sqlx::query("DELETE FROM pipeline_runs WHERE run_id = $1")
        .bind(record.run_id)
        .execute(&pool)
        .await
        .unwrap();
}
