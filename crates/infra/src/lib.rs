//! # esusync Infrastructure
//!
//! Implementations of the core ports plus all other "impure" code:
//! - HTTP client with bounded retry and the REST backend gateway
//! - SSE push-event listener and wire-format normalization
//! - Filesystem artifact store and restart-recovery state cache
//! - Polling fallback monitor and the auto-import scheduler
//! - Configuration loading

pub mod api;
pub mod config;
pub mod downloads;
pub mod errors;
pub mod http;
pub mod poller;
pub mod push;
pub mod scheduling;
pub mod state_cache;

pub use api::{ApiClient, ApiClientConfig, HttpBackendGateway};
pub use downloads::FsArtifactStore;
pub use errors::InfraError;
pub use http::HttpClient;
pub use poller::ProgressPoller;
pub use push::{ListenerMessage, PushListener, PushListenerConfig};
pub use scheduling::{AutoImportScheduler, ImportJob, SchedulerError};
pub use state_cache::FileStateCache;
