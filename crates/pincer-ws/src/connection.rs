//! WebSocket connection manager.
//!
//! Handles connection lifecycle, automatic reconnection with exponential
//! backoff, and resubscription after each reconnect.

use crate::error::{WsError, WsResult};
use crate::message::{StreamEvent, StreamMessage, StreamRequest};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL of the combined stream endpoint.
    pub url: String,
    /// Stream names to subscribe to after each connect.
    pub streams: Vec<String>,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Force a reconnect when no frame arrives within this window.
    pub idle_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            streams: Vec::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
            idle_timeout_ms: 60000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// WebSocket connection manager.
///
/// Owns the socket for its whole life. Market data frames are forwarded
/// to the event channel; command acks are consumed here.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: mpsc::Sender<StreamEvent>,
    next_request_id: AtomicU64,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            next_request_id: AtomicU64::new(1),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which makes both the read loop and
    /// the reconnect loop exit promptly.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect to the stream and run the read loop.
    pub async fn connect(&self) -> WsResult<()> {
        self.connect_with_retry().await
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            // Check shutdown flag at start of loop
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ConnectionState::Connecting;

            match self.try_connect().await {
                Ok(()) => {
                    // Connection closed normally
                    info!("WebSocket connection closed");
                }
                Err(e) => {
                    error!(?e, "WebSocket connection error");
                }
            }

            // Check shutdown flag before reconnect attempt
            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            attempt += 1;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            *self.state.write() = ConnectionState::Reconnecting;

            // Calculate backoff delay with jitter
            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis(), "Reconnecting");

            // Wait for delay OR shutdown signal (cancellation-aware sleep)
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        info!("WebSocket connected");

        // Subscriptions do not survive a reconnect, send them fresh.
        if !self.config.streams.is_empty() {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            let request = StreamRequest::subscribe(self.config.streams.clone(), id);
            let msg = serde_json::to_string(&request)?;
            write.send(Message::Text(msg)).await?;
            info!(
                request_id = id,
                streams = ?self.config.streams,
                "Sent stream subscriptions"
            );
        }

        let idle_timeout = Duration::from_millis(self.config.idle_timeout_ms);
        let mut last_frame = Instant::now();

        // Read loop
        loop {
            tokio::select! {
                // Shutdown signal - highest priority
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in read loop");
                    // Send WebSocket Close frame for graceful disconnect
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }

                // Incoming frame
                msg = read.next() => {
                    last_frame = Instant::now();
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(&text).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                // A silent stream means the connection is dead even if
                // the TCP session still looks alive.
                () = tokio::time::sleep_until(last_frame + idle_timeout) => {
                    error!(idle_ms = self.config.idle_timeout_ms, "Stream idle, forcing reconnect");
                    return Err(WsError::IdleTimeout(self.config.idle_timeout_ms));
                }
            }
        }
    }

    async fn handle_text_frame(&self, text: &str) -> WsResult<()> {
        let msg: StreamMessage = serde_json::from_str(text)?;

        match msg {
            StreamMessage::Ack(ack) => {
                // Command acks are transport-internal, never forwarded.
                if ack.is_success() {
                    debug!(request_id = ack.id, "Stream command acknowledged");
                } else {
                    warn!(request_id = ack.id, result = ?ack.result, "Stream command rejected");
                }
            }
            StreamMessage::Event(event) => {
                if self.event_tx.send(event).await.is_err() {
                    warn!("Event receiver dropped");
                }
            }
        }

        Ok(())
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // Exponential backoff: base * 2^(attempt-1)
        // attempt=1 -> base * 2^0 = base
        // attempt=2 -> base * 2^1 = 2*base
        // attempt=3 -> base * 2^2 = 4*base
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent);
        let delay = delay.min(max);

        // Add jitter (0-1000ms)
        let jitter = rand_jitter();
        Duration::from_millis(delay + jitter)
    }
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(base: u64, max: u64) -> ConnectionManager {
        let (tx, _rx) = mpsc::channel(8);
        ConnectionManager::new(
            ConnectionConfig {
                reconnect_base_delay_ms: base,
                reconnect_max_delay_ms: max,
                ..Default::default()
            },
            tx,
        )
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_reconnect_attempts, 0); // Infinite
        assert_eq!(config.idle_timeout_ms, 60000);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let mgr = manager_with(1000, 8000);

        // Jitter adds at most 1000ms on top of the deterministic part.
        let d1 = mgr.calculate_backoff_delay(1).as_millis() as u64;
        assert!((1000..2000).contains(&d1));

        let d3 = mgr.calculate_backoff_delay(3).as_millis() as u64;
        assert!((4000..5000).contains(&d3));

        let d10 = mgr.calculate_backoff_delay(10).as_millis() as u64;
        assert!((8000..9000).contains(&d10));
    }

    #[test]
    fn test_shutdown_flag() {
        let mgr = manager_with(1000, 8000);
        assert!(!mgr.is_shutdown());
        mgr.shutdown();
        assert!(mgr.is_shutdown());
    }

    #[test]
    fn test_initial_state_disconnected() {
        let mgr = manager_with(1000, 8000);
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
    }
}
