//! WebSocket message types.
//!
//! The venue multiplexes market data over a combined stream. Every data
//! frame carries a `stream` name and a `data` payload; command
//! acknowledgements carry a `result` and the request `id` instead.

use serde::{Deserialize, Serialize};

/// Incoming WebSocket message wrapper.
///
/// The two frame shapes share no required fields, so an untagged enum
/// resolves them directly. `CommandAck` rejects unknown fields to keep
/// it from swallowing data frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    /// Acknowledgement of a SUBSCRIBE/UNSUBSCRIBE command.
    Ack(CommandAck),
    /// Combined-stream market data frame.
    Event(StreamEvent),
}

impl StreamMessage {
    /// Stream name when this is a data frame.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Event(e) => Some(&e.stream),
            Self::Ack(_) => None,
        }
    }
}

/// Market data frame from the combined stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Stream identifier (e.g. "btcusd@bookTicker").
    pub stream: String,
    /// Event payload (flexible JSON, parsed downstream).
    pub data: serde_json::Value,
}

/// Acknowledgement for a stream command.
///
/// A successful subscribe acks with `result: null` and the request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandAck {
    pub result: Option<serde_json::Value>,
    pub id: u64,
}

impl CommandAck {
    /// A null result means the command was accepted.
    pub fn is_success(&self) -> bool {
        self.result.is_none()
    }
}

/// Outgoing stream command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    pub method: String,
    pub params: Vec<String>,
    pub id: u64,
}

impl StreamRequest {
    /// Create a SUBSCRIBE command for the given stream names.
    pub fn subscribe(params: Vec<String>, id: u64) -> Self {
        Self {
            method: "SUBSCRIBE".to_string(),
            params,
            id,
        }
    }

    /// Create an UNSUBSCRIBE command for the given stream names.
    pub fn unsubscribe(params: Vec<String>, id: u64) -> Self {
        Self {
            method: "UNSUBSCRIBE".to_string(),
            params,
            id,
        }
    }
}
