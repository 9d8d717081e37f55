//! Report records and the weekly aggregate handed from fetch to persist.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One time bucket from the API's `count=` aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReport {
    pub time: NaiveDate,
    pub count: u64,
}

/// Sum of report counts for one calendar week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAggregate {
    /// Week-ending date, `YYYY-MM-DD`.
    pub time: String,
    pub count: i64,
}

/// Column-oriented weekly aggregate set: column name → ordered values.
///
/// An empty fetch serializes as `{"time":[],"count":[]}` and an empty JSON
/// object deserializes to the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyColumns {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub count: Vec<i64>,
}

impl WeeklyColumns {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: &[WeeklyAggregate]) -> Self {
        let mut cols = Self {
            time: Vec::with_capacity(rows.len()),
            count: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            cols.time.push(row.time.clone());
            cols.count.push(row.count);
        }
        cols
    }

    /// Convert back into rows. Fails if the columns disagree in length or a
    /// count is negative.
    pub fn to_rows(&self) -> Result<Vec<WeeklyAggregate>, CoreError> {
        if self.time.len() != self.count.len() {
            return Err(CoreError::ColumnMismatch {
                time: self.time.len(),
                count: self.count.len(),
            });
        }
        self.time
            .iter()
            .zip(&self.count)
            .map(|(time, &count)| {
                if count < 0 {
                    return Err(CoreError::NegativeCount { time: time.clone(), count });
                }
                Ok(WeeklyAggregate { time: time.clone(), count })
            })
            .collect()
    }

    /// Number of weeks (length of the `time` column).
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty() && self.count.is_empty()
    }

    /// Sum of all weekly counts.
    pub fn total(&self) -> i64 {
        self.count.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(time: &str, count: i64) -> WeeklyAggregate {
        WeeklyAggregate { time: time.to_string(), count }
    }

    #[test]
    fn rows_to_columns_keeps_order() {
        let rows = vec![week("2021-01-03", 8), week("2021-01-10", 2)];
        let cols = WeeklyColumns::from_rows(&rows);
        assert_eq!(cols.time, vec!["2021-01-03", "2021-01-10"]);
        assert_eq!(cols.count, vec![8, 2]);
        assert_eq!(cols.total(), 10);
        assert_eq!(cols.to_rows().unwrap(), rows);
    }

    #[test]
    fn empty_object_decodes_as_empty() {
        let cols = serde_json::from_str::<WeeklyColumns>("{}").unwrap();
        assert!(cols.is_empty());
        assert!(cols.to_rows().unwrap().is_empty());
    }

    #[test]
    fn column_mismatch_is_rejected() {
        let cols = WeeklyColumns {
            time: vec!["2021-01-03".into()],
            count: vec![],
        };
        assert!(!cols.is_empty());
        assert!(matches!(
            cols.to_rows(),
            Err(CoreError::ColumnMismatch { time: 1, count: 0 })
        ));
    }

    #[test]
    fn negative_count_is_rejected() {
        let cols = WeeklyColumns {
            time: vec!["2021-01-03".into()],
            count: vec![-1],
        };
        assert!(matches!(cols.to_rows(), Err(CoreError::NegativeCount { .. })));
    }

    #[test]
    fn json_layout_is_column_major() {
        let cols = WeeklyColumns::from_rows(&[week("2021-01-03", 8)]);
        assert_eq!(serde_json::to_string(&cols).unwrap(), r#"{"time":["2021-01-03"],"count":[8]}"#);
    }
}
