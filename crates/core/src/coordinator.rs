//! The import/export coordinator.
//!
//! [`ImportCoordinator`] is the single owner of [`DashboardState`]. All
//! mutation flows through its `&mut self` methods, so dispatches serialize
//! by construction: the embedding event loop processes one command or push
//! event to completion before the next. HTTP calls within a method may run
//! concurrently across sections, but they only touch state through the
//! reducer after their futures resolve.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use esusync_domain::{
    AutoUpdateConfig, DashboardState, PushEvent, Result, Section, SectionFlags, TaskStatus,
    LAST_IMPORT_FALLBACK,
};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::ports::{ArtifactStore, BackendGateway, StateCache};
use crate::progress::enablement::Controls;
use crate::progress::reducer::{self, Action};

/// Coordinates per-section import/export jobs against the backend.
pub struct ImportCoordinator {
    state: DashboardState,
    gateway: Arc<dyn BackendGateway>,
    store: Arc<dyn ArtifactStore>,
    cache: Arc<dyn StateCache>,
}

impl ImportCoordinator {
    pub fn new(
        state: DashboardState,
        gateway: Arc<dyn BackendGateway>,
        store: Arc<dyn ArtifactStore>,
        cache: Arc<dyn StateCache>,
    ) -> Self {
        Self { state, gateway, store, cache }
    }

    /// Current state snapshot, for rendering.
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Derived control enablement for one section.
    pub fn controls(&self, section: Section) -> Controls {
        Controls::for_section(section, self.state.section(section))
    }

    fn dispatch(&mut self, action: Action) {
        reducer::apply(&mut self.state, action);
    }

    /// Populate state from the backend at startup.
    ///
    /// Cached flags are applied first so controls render sensibly before
    /// the REST round-trips finish. Per-section failures are logged and
    /// isolated; one broken section never blocks the others.
    pub async fn initialize(&mut self) {
        match self.cache.load().await {
            Ok(Some(flags)) => {
                for (section, cached) in flags {
                    self.dispatch(Action::SetFileAvailable {
                        section,
                        value: cached.file_available,
                    });
                    self.dispatch(Action::SetButtonDisabled {
                        section,
                        value: cached.button_disabled,
                    });
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "state cache unreadable; starting clean"),
        }

        match self.gateway.fetch_auto_update_config().await {
            Ok(config) => {
                self.dispatch(Action::SetAutoUpdate { enabled: config.enabled, time: config.time });
            }
            Err(err) => warn!(error = %err, "auto-update config fetch failed"),
        }

        match self.gateway.fetch_last_imports().await {
            Ok(map) => {
                for section in Section::ALL {
                    let value = map
                        .get(section.as_str())
                        .cloned()
                        .unwrap_or_else(|| LAST_IMPORT_FALLBACK.to_string());
                    self.dispatch(Action::SetLastImport { section, value });
                }
            }
            Err(err) => warn!(error = %err, "last-import fetch failed"),
        }

        let fetches = Section::ALL.map(|section| {
            let gateway = Arc::clone(&self.gateway);
            async move {
                let snapshot = async {
                    let available = gateway.check_file(section).await?;
                    let progress = gateway.fetch_progress(section).await?;
                    // Status fetch failures degrade to Unknown instead of
                    // failing the section.
                    let status = gateway
                        .fetch_task_status(section)
                        .await
                        .unwrap_or(TaskStatus::Unknown);
                    Ok::<_, esusync_domain::SyncError>((available, progress, status))
                }
                .await;
                (section, snapshot)
            }
        });

        for (section, snapshot) in join_all(fetches).await {
            match snapshot {
                Ok((available, progress, status)) => {
                    let running =
                        status == TaskStatus::Running || (progress > 0 && progress < 100);
                    self.dispatch(Action::SetFileAvailable { section, value: available });
                    self.dispatch(Action::SetProgress { section, value: progress });
                    self.dispatch(Action::SetRunning { section, value: running });
                    self.dispatch(Action::SetButtonDisabled { section, value: running });
                }
                Err(err) => {
                    warn!(%section, error = %err, "section initialization failed; continuing");
                }
            }
        }
    }

    /// Reconcile local state with server truth after a push-channel
    /// reconnect. Events missed while disconnected are unrecoverable, so
    /// the fetched values are applied verbatim.
    pub async fn resync(&mut self) {
        let fetches = Section::ALL.map(|section| {
            let gateway = Arc::clone(&self.gateway);
            async move {
                let progress = gateway.fetch_progress(section).await;
                let status =
                    gateway.fetch_task_status(section).await.unwrap_or(TaskStatus::Unknown);
                (section, progress, status)
            }
        });

        for (section, progress, status) in join_all(fetches).await {
            match progress {
                Ok(progress) => {
                    let running =
                        status == TaskStatus::Running || (progress > 0 && progress < 100);
                    self.dispatch(Action::SetProgress { section, value: progress });
                    self.dispatch(Action::SetRunning { section, value: running });
                    self.dispatch(Action::SetButtonDisabled { section, value: running });
                    self.dispatch(Action::SetFileAvailable { section, value: progress == 100 });
                }
                Err(err) => warn!(%section, error = %err, "resync failed for section"),
            }
        }
    }

    /// Apply one normalized push event.
    pub async fn handle_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::TaskStarted { section } => {
                debug!(%section, "task started");
                self.dispatch(Action::SetButtonDisabled { section, value: true });
                self.dispatch(Action::SetRunning { section, value: true });
                self.dispatch(Action::SetProgress { section, value: 0 });
                self.dispatch(Action::SetError { section, message: None });
            }
            PushEvent::Progress { section, percent, error } => {
                self.handle_progress(section, percent, error).await;
            }
            PushEvent::AddressFix { total, updated } => {
                self.dispatch(Action::SetAddressFixProgress { total, updated });
            }
            PushEvent::TaskEnded { section } => {
                debug!(%section, "task ended");
                self.dispatch(Action::SetButtonDisabled { section, value: false });
                self.dispatch(Action::SetRunning { section, value: false });
                self.dispatch(Action::SetExtracting { section, value: false });
                self.dispatch(Action::SetProgress { section, value: 100 });
                self.dispatch(Action::SetFileAvailable { section, value: true });
                self.download_and_store(section).await;
            }
        }
        self.persist_flags().await;
    }

    async fn handle_progress(&mut self, section: Section, percent: u8, error: Option<String>) {
        if let Some(message) = error {
            // The progress value accompanying an error report is discarded.
            warn!(%section, %message, "job reported an error");
            self.dispatch(Action::SetError { section, message: Some(message) });
            self.dispatch(Action::SetRunning { section, value: false });
            self.dispatch(Action::SetButtonDisabled { section, value: false });
            self.dispatch(Action::SetExtracting { section, value: false });
            return;
        }

        let current = self.state.section(section).progress;
        if percent >= current || percent == 0 {
            self.dispatch(Action::SetProgress { section, value: percent });
        } else {
            debug!(%section, percent, current, "stale progress discarded");
        }

        let running = percent > 0 && percent < 100;
        self.dispatch(Action::SetRunning { section, value: running });
        self.dispatch(Action::SetButtonDisabled { section, value: running });

        if percent == 100 {
            self.dispatch(Action::SetFileAvailable { section, value: true });
            self.dispatch(Action::SetLastImport {
                section,
                value: format_last_import(Local::now()),
            });
            self.dispatch(Action::SetExtracting { section, value: false });
            self.download_and_store(section).await;
        }
    }

    /// Fetch the generated artifact and persist it. A failure here is a
    /// section error, but the job itself succeeded so `file_available`
    /// stays set.
    async fn download_and_store(&mut self, section: Section) {
        match self.gateway.download_artifact(section).await {
            Ok(artifact) => match self.store.save(&artifact).await {
                Ok(path) => {
                    info!(%section, path = %path.display(), "artifact saved");
                }
                Err(err) => {
                    error!(%section, error = %err, "artifact write failed");
                    self.dispatch(Action::SetError {
                        section,
                        message: Some(format!("failed to save downloaded file: {err}")),
                    });
                }
            },
            Err(err) => {
                error!(%section, error = %err, "artifact download failed");
                self.dispatch(Action::SetError {
                    section,
                    message: Some(format!("failed to download file: {err}")),
                });
            }
        }
    }

    /// Start an import job. A duplicate request while the section is
    /// already running is a guarded no-op; submission failures are surfaced
    /// as section errors and never retried automatically.
    pub async fn start_import(&mut self, section: Section) {
        if self.state.section(section).running {
            debug!(%section, "import already running; ignoring duplicate request");
            return;
        }

        self.dispatch(Action::SetProgress { section, value: 0 });
        self.dispatch(Action::SetButtonDisabled { section, value: true });
        self.dispatch(Action::SetRunning { section, value: true });
        self.dispatch(Action::SetFileAvailable { section, value: false });
        self.dispatch(Action::SetError { section, message: None });

        let period = section.has_billing_period().then(|| self.state.period.clone());
        if let Err(err) = self.gateway.start_import(section, period.as_ref()).await {
            error!(%section, error = %err, "import request rejected");
            self.dispatch(Action::SetError {
                section,
                message: Some(format!("failed to start import for {section}: {err}")),
            });
            self.dispatch(Action::SetButtonDisabled { section, value: false });
            self.dispatch(Action::SetRunning { section, value: false });
        }
        self.persist_flags().await;
    }

    /// Start an export job. Completion (and the artifact download) arrives
    /// via the push channel.
    pub async fn start_extract(&mut self, section: Section) {
        if !section.supports_extract() {
            self.dispatch(Action::SetError {
                section,
                message: Some(format!("section {section} does not support extraction")),
            });
            return;
        }
        if self.state.section(section).extracting || self.state.section(section).running {
            debug!(%section, "extraction blocked by active job");
            return;
        }

        self.dispatch(Action::SetExtracting { section, value: true });
        self.dispatch(Action::SetProgress { section, value: 0 });
        self.dispatch(Action::SetError { section, message: None });

        if let Err(err) = self.gateway.start_export(section).await {
            error!(%section, error = %err, "export request rejected");
            self.dispatch(Action::SetExtracting { section, value: false });
            self.dispatch(Action::SetError {
                section,
                message: Some(format!("failed to start extraction for {section}: {err}")),
            });
        }
    }

    /// Update the billing reporting period.
    pub fn set_period(&mut self, year: i32, month: String) {
        self.dispatch(Action::SetPeriod { year, month });
    }

    /// Persist the auto-import schedule, locally and on the backend.
    pub async fn save_auto_update(&mut self, config: AutoUpdateConfig) -> Result<()> {
        self.dispatch(Action::SetAutoUpdate {
            enabled: config.enabled,
            time: config.time.clone(),
        });
        self.gateway.save_auto_update_config(&config).await
    }

    /// Generate a billing file synchronously and store it. Failures are
    /// additionally surfaced on the billing section's error state.
    pub async fn generate_billing(&mut self) -> Result<PathBuf> {
        let result = async {
            let artifact = self.gateway.generate_billing_file().await?;
            self.store.save(&artifact).await
        }
        .await;

        if let Err(err) = &result {
            self.dispatch(Action::SetError {
                section: Section::Bpa,
                message: Some(format!("billing file generation failed: {err}")),
            });
        }
        result
    }

    /// List previously generated billing files.
    pub async fn list_billing_files(&self) -> Result<Vec<String>> {
        self.gateway.list_billing_files().await
    }

    /// Download one managed billing file into the artifact store.
    pub async fn download_billing_file(&mut self, filename: &str) -> Result<PathBuf> {
        let artifact = self.gateway.download_billing_file(filename).await?;
        self.store.save(&artifact).await
    }

    /// Delete one managed billing file.
    pub async fn delete_billing_file(&mut self, filename: &str) -> Result<()> {
        self.gateway.delete_billing_file(filename).await
    }

    /// Kick off the address-correction run; counter updates arrive on the
    /// `cep` push sub-channel.
    pub async fn fix_addresses(&mut self) -> Result<()> {
        self.dispatch(Action::SetAddressFixProgress { total: 0, updated: 0 });
        self.gateway.fix_addresses().await
    }

    async fn persist_flags(&self) {
        let flags: BTreeMap<Section, SectionFlags> = self
            .state
            .iter()
            .map(|(section, state)| {
                (
                    section,
                    SectionFlags {
                        file_available: state.file_available,
                        button_disabled: state.button_disabled,
                    },
                )
            })
            .collect();
        if let Err(err) = self.cache.save(&flags).await {
            warn!(error = %err, "state cache write failed");
        }
    }
}

fn format_last_import(now: DateTime<Local>) -> String {
    now.format("%H:%M %d-%m-%Y").to_string()
}
