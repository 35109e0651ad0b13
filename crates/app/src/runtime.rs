//! Event loop around the coordinator.
//!
//! The coordinator is single-owner state; this loop is the serialization
//! point. Push events, scheduled jobs, and shutdown requests all funnel
//! through one `select!` so no two dispatches ever interleave.

use std::sync::Arc;

use async_trait::async_trait;
use esusync_core::ImportCoordinator;
use esusync_domain::Section;
use esusync_infra::scheduling::ImportJob;
use esusync_infra::ListenerMessage;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Operations the loop executes against the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Import every section in display order; fired by the scheduler.
    ImportAll,
    /// Stop the loop; sent by the signal handler.
    Shutdown,
}

/// Scheduler job that feeds [`Command::ImportAll`] into the loop instead
/// of touching the coordinator directly.
pub struct ChannelImportJob {
    tx: mpsc::Sender<Command>,
}

impl ChannelImportJob {
    pub fn new(tx: mpsc::Sender<Command>) -> Arc<Self> {
        Arc::new(Self { tx })
    }
}

#[async_trait]
impl ImportJob for ChannelImportJob {
    async fn run(&self) {
        if self.tx.send(Command::ImportAll).await.is_err() {
            warn!("command channel closed; scheduled import dropped");
        }
    }
}

/// Drive the coordinator until [`Command::Shutdown`] arrives or both
/// input channels close.
pub async fn run(
    coordinator: &mut ImportCoordinator,
    mut events: mpsc::Receiver<ListenerMessage>,
    mut commands: mpsc::Receiver<Command>,
) {
    loop {
        tokio::select! {
            message = events.recv() => match message {
                Some(ListenerMessage::Connected) => {
                    info!("push channel established");
                }
                Some(ListenerMessage::Reconnected) => {
                    // State may have moved while offline.
                    info!("push channel re-established; resyncing");
                    coordinator.resync().await;
                }
                Some(ListenerMessage::Event(event)) => {
                    coordinator.handle_event(event).await;
                }
                None => {
                    warn!("push channel closed");
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(Command::ImportAll) => {
                    info!("scheduled import of all sections");
                    for section in Section::ALL {
                        coordinator.start_import(section).await;
                    }
                }
                Some(Command::Shutdown) => {
                    info!("shutdown requested");
                    break;
                }
                None => break,
            },
        }
    }
}
