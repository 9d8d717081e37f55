//! Fetch-and-aggregate step: query the openFDA count endpoint for one
//! calendar month and fold the daily buckets into Sunday-ending weeks.

pub mod aggregate;
pub mod client;
pub mod query;
pub mod traits;

pub use aggregate::{aggregate_weekly, week_ending};
pub use client::OpenFdaClient;
pub use query::query_url;
pub use traits::{FetchError, WeeklySource};
