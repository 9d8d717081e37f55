use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid month {month} for year {year}")]
    InvalidWindow { year: i32, month: u32 },

    #[error("Column length mismatch: time has {time} values, count has {count}")]
    ColumnMismatch { time: usize, count: usize },

    #[error("Negative count {count} for week {time}")]
    NegativeCount { time: String, count: i64 },
}
