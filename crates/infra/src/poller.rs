//! Polling fallback for progress updates.
//!
//! When the push channel is down for good (reconnection budget spent), a
//! running task can still be tracked by polling its progress endpoint.
//! The poller feeds the same channel as the listener, so the consumer
//! does not care where updates come from.

use std::sync::Arc;
use std::time::Duration;

use esusync_core::ports::BackendGateway;
use esusync_domain::{PushEvent, Section};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::push::ListenerMessage;

pub struct ProgressPoller {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressPoller {
    /// Poll `section`'s progress every `interval`, forwarding each reading
    /// as a [`PushEvent::Progress`]. The task ends on its own once the
    /// section reports completion.
    pub fn spawn(
        gateway: Arc<dyn BackendGateway>,
        section: Section,
        interval: Duration,
        tx: mpsc::Sender<ListenerMessage>,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let percent = match gateway.fetch_progress(section).await {
                    Ok(percent) => percent,
                    Err(err) => {
                        warn!(%section, %err, "progress poll failed");
                        continue;
                    }
                };

                debug!(%section, percent, "polled progress");
                let event = PushEvent::Progress { section, percent, error: None };
                if tx.send(ListenerMessage::Event(event)).await.is_err() {
                    break;
                }
                if percent >= 100 {
                    break;
                }
            }
        });
        Self { token, handle }
    }

    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}
