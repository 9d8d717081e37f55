use std::env;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::DATASET_KEY;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub openfda: OpenFdaConfig,
    pub postgres: PostgresConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `OPENFDA_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("OPENFDA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            openfda: OpenFdaConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  openfda:   url={}, drug={:?}", self.openfda.base_url, self.openfda.drug);
        tracing::info!(
            "  postgres:  host={}, db={}, table={}",
            self.postgres.host, self.postgres.database, self.postgres.table
        );
        tracing::info!(
            "  schedule:  cron={:?}, start={}, max_active_runs={}, retries={}",
            self.schedule.cron,
            self.schedule.start_date,
            self.schedule.max_active_runs,
            self.schedule.retries
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "openfda": {
                "base_url": self.openfda.base_url,
                "drug": self.openfda.drug,
                "count_field": self.openfda.count_field,
                "timeout_secs": self.openfda.timeout_secs,
            },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "table": self.postgres.table,
                "configured": self.postgres.is_configured(),
            },
            "schedule": {
                "cron": self.schedule.cron,
                "start_date": self.schedule.start_date,
                "max_active_runs": self.schedule.max_active_runs,
                "retries": self.schedule.retries,
                "retry_delay": self.schedule.retry_delay,
                "poll_interval": self.schedule.poll_interval,
            },
        })
    }
}

// ── openFDA ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenFdaConfig {
    pub base_url: String,
    /// Value matched against `patient.drug.medicinalproduct`.
    pub drug: String,
    /// Date field the API counts over.
    pub count_field: String,
    pub timeout_secs: u64,
}

impl OpenFdaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            base_url: profiled_env_or(p, "OPENFDA_BASE_URL", "https://api.fda.gov/drug/event.json"),
            drug: profiled_env_or(p, "OPENFDA_DRUG", "sildenafil citrate"),
            count_field: profiled_env_or(p, "OPENFDA_COUNT_FIELD", "receivedate"),
            timeout_secs: profiled_env_u64(p, "OPENFDA_TIMEOUT_SECS", 30),
        }
    }
}

impl Default for OpenFdaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fda.gov/drug/event.json".to_string(),
            drug: "sildenafil citrate".to_string(),
            count_field: "receivedate".to_string(),
            timeout_secs: 30,
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
    /// Destination table for weekly aggregates.
    pub table: String,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "PG_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "openfda"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 5),
            table: profiled_env_or(p, "OPENFDA_TABLE", DATASET_KEY),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── Schedule ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 5- or 6-field cron expression for period starts.
    pub cron: String,
    /// First logical date eligible for catchup.
    pub start_date: NaiveDate,
    pub max_active_runs: usize,
    pub retries: u32,
    /// Delay between attempts, e.g. `5m`, `1h30m`.
    pub retry_delay: String,
    /// Upper bound on how long the daemon sleeps between checks.
    pub poll_interval: String,
}

const DEFAULT_START_DATE: &str = "2020-01-01";

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        let start_raw = profiled_env_or(p, "SCHEDULE_START_DATE", DEFAULT_START_DATE);
        let start_date = NaiveDate::parse_from_str(&start_raw, "%Y-%m-%d").unwrap_or_else(|_| {
            tracing::warn!(value = %start_raw, "invalid SCHEDULE_START_DATE, using {}", DEFAULT_START_DATE);
            default_start_date()
        });
        Self {
            cron: profiled_env_or(p, "SCHEDULE_CRON", "0 0 1 * *"),
            start_date,
            max_active_runs: profiled_env_u32(p, "SCHEDULE_MAX_ACTIVE_RUNS", 5).max(1) as usize,
            retries: profiled_env_u32(p, "SCHEDULE_RETRIES", 1),
            retry_delay: profiled_env_or(p, "SCHEDULE_RETRY_DELAY", "5m"),
            poll_interval: profiled_env_or(p, "SCHEDULE_POLL_INTERVAL", "1h"),
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 0 1 * *".to_string(),
            start_date: default_start_date(),
            max_active_runs: 5,
            retries: 1,
            retry_delay: "5m".to_string(),
            poll_interval: "1h".to_string(),
        }
    }
}
