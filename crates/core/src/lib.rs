//! # esusync Core
//!
//! Pure coordination logic:
//! - The progress reducer and derived control enablement
//! - Backend/storage ports implemented by `esusync-infra`
//! - [`ImportCoordinator`], the single owner of dashboard state

pub mod coordinator;
pub mod ports;
pub mod progress;

pub use coordinator::ImportCoordinator;
pub use ports::{Artifact, ArtifactStore, BackendGateway, StateCache};
pub use progress::enablement::Controls;
pub use progress::reducer::{apply, Action};
