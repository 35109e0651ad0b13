//! Port interfaces implemented by the infrastructure layer.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use esusync_domain::{
    AutoUpdateConfig, BillingPeriod, Result, Section, SectionFlags, TaskStatus,
};

/// A downloaded artifact: payload bytes plus the server-provided filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// REST backend operations the coordinator depends on.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Whether a previously generated artifact exists for the section.
    async fn check_file(&self, section: Section) -> Result<bool>;

    /// Current job progress, 0..=100.
    async fn fetch_progress(&self, section: Section) -> Result<u8>;

    /// Current server-side task status.
    async fn fetch_task_status(&self, section: Section) -> Result<TaskStatus>;

    /// Last-import display strings keyed by section wire key.
    async fn fetch_last_imports(&self) -> Result<BTreeMap<String, String>>;

    /// Saved auto-import schedule configuration.
    async fn fetch_auto_update_config(&self) -> Result<AutoUpdateConfig>;

    /// Persist the auto-import schedule configuration.
    async fn save_auto_update_config(&self, config: &AutoUpdateConfig) -> Result<()>;

    /// Start an import job. `period` is set only for billing-period
    /// sections; completion arrives via the push channel.
    async fn start_import(&self, section: Section, period: Option<&BillingPeriod>) -> Result<()>;

    /// Start an export job; the backend must acknowledge with a started
    /// status. Completion arrives via the push channel.
    async fn start_export(&self, section: Section) -> Result<()>;

    /// Download the exported artifact for a completed job.
    async fn download_artifact(&self, section: Section) -> Result<Artifact>;

    /// Generate a billing file synchronously; the response body is the
    /// artifact itself.
    async fn generate_billing_file(&self) -> Result<Artifact>;

    /// List previously generated billing files.
    async fn list_billing_files(&self) -> Result<Vec<String>>;

    /// Download one managed billing file by name.
    async fn download_billing_file(&self, filename: &str) -> Result<Artifact>;

    /// Delete one managed billing file by name.
    async fn delete_billing_file(&self, filename: &str) -> Result<()>;

    /// Trigger the address-correction run; progress arrives on the `cep`
    /// push sub-channel.
    async fn fix_addresses(&self) -> Result<()>;
}

/// Sink for downloaded artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist the artifact and return where it landed.
    async fn save(&self, artifact: &Artifact) -> Result<PathBuf>;
}

/// Best-effort persistence of a few per-section flags so a restart can
/// restore button state before the first REST round-trip completes.
#[async_trait]
pub trait StateCache: Send + Sync {
    /// Load cached flags; `None` when no usable cache exists.
    async fn load(&self) -> Result<Option<BTreeMap<Section, SectionFlags>>>;

    /// Replace the cached flags.
    async fn save(&self, flags: &BTreeMap<Section, SectionFlags>) -> Result<()>;
}
