//! WebSocket client for the venue's combined market stream.
//!
//! Provides robust stream connectivity with:
//! - Automatic reconnection with exponential backoff
//! - Resubscription after each reconnect
//! - Idle detection that forces a reconnect on silent streams

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use message::{CommandAck, StreamEvent, StreamMessage, StreamRequest};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
