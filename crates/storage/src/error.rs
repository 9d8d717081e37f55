use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid payload: {0}")]
    Payload(#[from] openfda_core::CoreError),

    #[error("invalid table name {0:?}")]
    InvalidTable(String),
}
