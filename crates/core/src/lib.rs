pub mod config;
pub mod error;
pub mod record;
pub mod window;

pub use config::Config;
pub use error::*;
pub use record::*;
pub use window::QueryWindow;

/// Historical name of the weekly dataset. Used as the default destination
/// table and as the log field for a run's payload.
pub const DATASET_KEY: &str = "openfda_data";
