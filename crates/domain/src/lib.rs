//! # esusync Domain
//!
//! Shared domain types for the import/export coordinator:
//! - Section identifiers and per-section state
//! - Canonical push events (post-normalization)
//! - Configuration types
//! - The error enum used across all crates

pub mod config;
pub mod errors;
pub mod types;

pub use config::{AppConfig, BackendConfig, CacheConfig, DownloadConfig, PushConfig};
pub use errors::{Result, SyncError};
pub use types::events::PushEvent;
pub use types::{
    AddressFixProgress, AutoUpdateConfig, BillingPeriod, DashboardState, Section, SectionFlags,
    SectionState, TaskStatus, LAST_IMPORT_FALLBACK,
};
