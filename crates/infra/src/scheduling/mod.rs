//! Scheduled execution of the nightly auto-import.

pub mod auto_import;
pub mod error;

pub use auto_import::{cron_from_time, AutoImportScheduler, ImportJob};
pub use error::SchedulerError;
