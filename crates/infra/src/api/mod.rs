//! REST backend access.

pub mod billing;
pub mod client;
pub mod gateway;

pub use client::{ApiClient, ApiClientConfig};
pub use gateway::HttpBackendGateway;
