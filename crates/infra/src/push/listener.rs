//! Background task that keeps an SSE subscription to the backend alive.
//!
//! Connection loss triggers bounded reconnection with a growing delay;
//! the attempt counter resets once a connection is established again.
//! After a reconnect the consumer is told via
//! [`ListenerMessage::Reconnected`] so it can resync state it may have
//! missed while offline.

use std::sync::Mutex;
use std::time::Duration;

use esusync_domain::{PushEvent, SyncError};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::sse::SseParser;
use super::wire;

/// Messages delivered to the listener's consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerMessage {
    /// First successful subscription.
    Connected,
    /// Subscription re-established after a drop; state may be stale.
    Reconnected,
    Event(PushEvent),
}

#[derive(Debug, Clone)]
pub struct PushListenerConfig {
    /// Full URL of the event stream, e.g. `http://host:5000/events`.
    pub url: String,
    /// Reconnection attempts before giving up.
    pub reconnect_attempts: u32,
    /// Delay before the first reconnection attempt; later attempts wait
    /// a multiple of this.
    pub reconnect_base_delay: Duration,
}

impl Default for PushListenerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000/events".to_string(),
            reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(2000),
        }
    }
}

/// Long-lived SSE subscriber with a start/stop lifecycle.
pub struct PushListener {
    config: PushListenerConfig,
    client: reqwest::Client,
    lifecycle: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl PushListener {
    pub fn new(config: PushListenerConfig) -> Result<Self, SyncError> {
        // No total request timeout: the stream is expected to stay open
        // indefinitely. Only the connection attempt is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .no_proxy()
            .build()
            .map_err(|err| crate::errors::InfraError::from(err).0)?;
        Ok(Self { config, client, lifecycle: Mutex::new(None) })
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Spawn the subscription task. Decoded events land on `tx`.
    pub fn start(&self, tx: mpsc::Sender<ListenerMessage>) -> Result<(), SyncError> {
        let mut guard = self
            .lifecycle
            .lock()
            .map_err(|_| SyncError::Internal("push listener lock poisoned".to_string()))?;
        if guard.is_some() {
            return Err(SyncError::Internal("push listener is already running".to_string()));
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.client.clone(),
            self.config.clone(),
            tx,
            token.clone(),
        ));
        *guard = Some((token, handle));
        info!(url = %self.config.url, "push listener started");
        Ok(())
    }

    /// Cancel the subscription task and wait for it to finish.
    pub async fn stop(&self) -> Result<(), SyncError> {
        let entry = {
            let mut guard = self
                .lifecycle
                .lock()
                .map_err(|_| SyncError::Internal("push listener lock poisoned".to_string()))?;
            guard.take()
        };
        let Some((token, handle)) = entry else {
            return Err(SyncError::Internal("push listener is not running".to_string()));
        };

        token.cancel();
        if let Err(err) = handle.await {
            warn!(%err, "push listener task did not shut down cleanly");
        }
        info!("push listener stopped");
        Ok(())
    }
}

async fn run(
    client: reqwest::Client,
    config: PushListenerConfig,
    tx: mpsc::Sender<ListenerMessage>,
    token: CancellationToken,
) {
    let mut failed_attempts: u32 = 0;
    let mut ever_connected = false;

    loop {
        if token.is_cancelled() {
            break;
        }

        match subscribe_once(&client, &config, &tx, &token, &mut ever_connected).await {
            Ok(ConnectionOutcome::Cancelled) | Ok(ConnectionOutcome::ConsumerGone) => break,
            Ok(ConnectionOutcome::StreamEnded) => {
                // A completed connection resets the budget.
                failed_attempts = 0;
                warn!(url = %config.url, "event stream closed by backend");
            }
            Err(err) => {
                failed_attempts += 1;
                warn!(url = %config.url, attempt = failed_attempts, %err, "event stream failed");
                if failed_attempts >= config.reconnect_attempts {
                    error!(
                        url = %config.url,
                        attempts = failed_attempts,
                        "giving up on the event stream"
                    );
                    break;
                }
            }
        }

        let delay = config.reconnect_base_delay.saturating_mul(failed_attempts.max(1));
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

enum ConnectionOutcome {
    StreamEnded,
    Cancelled,
    ConsumerGone,
}

async fn subscribe_once(
    client: &reqwest::Client,
    config: &PushListenerConfig,
    tx: &mpsc::Sender<ListenerMessage>,
    token: &CancellationToken,
    ever_connected: &mut bool,
) -> Result<ConnectionOutcome, SyncError> {
    let response = client
        .get(&config.url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|err| SyncError::from(crate::errors::InfraError::from(err)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::Network(format!("{} returned {status}", config.url)));
    }

    let announcement = if *ever_connected {
        ListenerMessage::Reconnected
    } else {
        ListenerMessage::Connected
    };
    *ever_connected = true;
    if tx.send(announcement).await.is_err() {
        return Ok(ConnectionOutcome::ConsumerGone);
    }

    let mut stream = response.bytes_stream();
    let mut parser = SseParser::new();
    let mut buffer = String::new();

    loop {
        let chunk = tokio::select! {
            _ = token.cancelled() => return Ok(ConnectionOutcome::Cancelled),
            chunk = stream.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                return Err(SyncError::from(crate::errors::InfraError::from(err)));
            }
            None => return Ok(ConnectionOutcome::StreamEnded),
        };

        buffer.push_str(&String::from_utf8_lossy(&bytes));
        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            let Some(frame) = parser.push_line(line.trim_end_matches('\n')) else {
                continue;
            };
            debug!(event = %frame.event, "push frame received");
            if let Some(event) = wire::normalize(&frame) {
                if tx.send(ListenerMessage::Event(event)).await.is_err() {
                    return Ok(ConnectionOutcome::ConsumerGone);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use esusync_domain::Section;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const STREAM_BODY: &str = concat!(
        ": keep-alive\n\n",
        "event: start-task\ndata: {\"task\":\"bpa\"}\n\n",
        "event: progress_update\ndata: {\"tipo\":\"bpa\",\"percentual\":100}\n\n",
        "event: end_task\ndata: \"bpa\"\n\n",
    );

    fn test_config(server: &MockServer) -> PushListenerConfig {
        PushListenerConfig {
            url: format!("{}/events", server.uri()),
            reconnect_attempts: 2,
            reconnect_base_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn delivers_decoded_events_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string(STREAM_BODY),
            )
            .mount(&server)
            .await;

        let listener = PushListener::new(test_config(&server)).expect("listener");
        let (tx, mut rx) = mpsc::channel(16);
        listener.start(tx).expect("started");

        assert_eq!(rx.recv().await, Some(ListenerMessage::Connected));
        assert_eq!(
            rx.recv().await,
            Some(ListenerMessage::Event(PushEvent::TaskStarted { section: Section::Bpa }))
        );
        assert_eq!(
            rx.recv().await,
            Some(ListenerMessage::Event(PushEvent::Progress {
                section: Section::Bpa,
                percent: 100,
                error: None,
            }))
        );
        assert_eq!(
            rx.recv().await,
            Some(ListenerMessage::Event(PushEvent::TaskEnded { section: Section::Bpa }))
        );

        listener.stop().await.expect("stopped");
        assert!(!listener.is_running());
    }

    #[tokio::test]
    async fn reconnects_after_the_stream_closes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string("event: end_task\ndata: \"visitas\"\n\n"),
            )
            .mount(&server)
            .await;

        let listener = PushListener::new(test_config(&server)).expect("listener");
        let (tx, mut rx) = mpsc::channel(16);
        listener.start(tx).expect("started");

        assert_eq!(rx.recv().await, Some(ListenerMessage::Connected));
        assert_eq!(
            rx.recv().await,
            Some(ListenerMessage::Event(PushEvent::TaskEnded { section: Section::Visitas }))
        );
        // The template body ends the stream, so the listener resubscribes.
        assert_eq!(rx.recv().await, Some(ListenerMessage::Reconnected));

        listener.stop().await.expect("stopped");
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let listener = PushListener::new(test_config(&server)).expect("listener");
        let (tx, _rx) = mpsc::channel(16);
        listener.start(tx.clone()).expect("started");
        assert!(listener.start(tx).is_err());
        listener.stop().await.expect("stopped");
    }
}
