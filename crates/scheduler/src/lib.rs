//! Monthly trigger, retry and catchup for the fetch → persist job.
//!
//! The two steps of one run are strictly sequential and hand their result
//! over as a value. Several runs may execute at once, bounded by
//! `max_active_runs`.

pub mod cron;
pub mod job;
pub mod retry;
pub mod runner;

pub use self::cron::{normalize_cron, parse_duration, MonthlySchedule, ScheduleError};
pub use self::job::{JobError, JobRun, MonthlyJob, RunReport};
pub use self::retry::RetryPolicy;
pub use self::runner::{RunSummary, Runner};
