//! Cron ticks → monthly logical dates.

use std::str::FromStr;
use std::time::Duration;

use ::cron::Schedule;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use openfda_core::QueryWindow;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
}

/// Period-start trigger with a catchup start date.
///
/// A tick `L` becomes runnable once the following tick has passed, i.e.
/// after the period `[L, next(L))` is over. Each logical date covers the
/// calendar month it falls in.
#[derive(Debug, Clone)]
pub struct MonthlySchedule {
    expression: String,
    schedule: Schedule,
    start: DateTime<Utc>,
}

impl MonthlySchedule {
    pub fn new(expression: &str, start_date: NaiveDate) -> Result<Self, ScheduleError> {
        let expression = normalize_cron(expression);
        let schedule = Schedule::from_str(&expression).map_err(|e| ScheduleError::InvalidCron {
            expression: expression.clone(),
            reason: e.to_string(),
        })?;
        let start = Utc.from_utc_datetime(&start_date.and_time(NaiveTime::MIN));
        Ok(Self {
            expression,
            schedule,
            start,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Logical dates from the start date whose period has fully elapsed by `until`.
    pub fn logical_dates(&self, until: DateTime<Utc>) -> Vec<NaiveDate> {
        let mut ticks = self.schedule.after(&(self.start - chrono::Duration::seconds(1)));
        let Some(mut current) = ticks.next() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for next in ticks {
            if next > until {
                break;
            }
            out.push(current.date_naive());
            current = next;
        }
        out
    }

    /// The first tick strictly after `now`: when the next period becomes due.
    pub fn next_tick(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }

    /// Query window for a logical date.
    pub fn window_for(logical_date: NaiveDate) -> QueryWindow {
        QueryWindow::containing(logical_date)
    }
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Shorthands such as `@monthly` pass through unchanged.
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    let field_count = trimmed.split_whitespace().count();
    if field_count == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components: `Xd` (days), `Xh` (hours), `Xm` (minutes), `Xs` (seconds).
/// Components can be combined: "2h30m", "1d12h", "90s". A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ScheduleError> {
    let invalid = || ScheduleError::InvalidDuration(s.to_string());
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }
        let n: u64 = num_buf.parse().map_err(|_| invalid())?;
        num_buf.clear();
        let unit = match ch {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return Err(invalid()),
        };
        total_secs = n
            .checked_mul(unit)
            .and_then(|v| total_secs.checked_add(v))
            .ok_or_else(invalid)?;
        found_unit = true;
    }

    if !num_buf.is_empty() {
        // "30m15" is ambiguous.
        if found_unit {
            return Err(invalid());
        }
        total_secs = num_buf.parse().map_err(|_| invalid())?;
    }

    Ok(Duration::from_secs(total_secs))
}
