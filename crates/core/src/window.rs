//! Calendar-month query windows.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;

/// A `(year, month)` pair covering one calendar month, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QueryWindow {
    year: i32,
    month: u32,
}

impl QueryWindow {
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(CoreError::InvalidWindow { year, month });
        }
        Ok(Self { year, month })
    }

    /// Window for the calendar month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn start(&self) -> NaiveDate {
        // Validated in `new`/`containing`.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month.
    pub fn end(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first_of_next| first_of_next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// `YYYYMMDD` form of the first day, as the API expects it.
    pub fn start_token(&self) -> String {
        self.start().format("%Y%m%d").to_string()
    }

    /// `YYYYMMDD` form of the last day.
    pub fn end_token(&self) -> String {
        self.end().format("%Y%m%d").to_string()
    }

    /// The following month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
