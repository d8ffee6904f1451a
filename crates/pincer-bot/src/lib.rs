//! Pincer spread-capture trading bot.
//!
//! Main application that wires all components together:
//! - WebSocket connection to the venue's combined stream
//! - Quote intake and caching
//! - Opportunity detection
//! - Order lifecycle execution behind a global lock (trade mode)

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, Credentials, OperatingMode, VenueConfig, WsConfig};
pub use error::{AppError, AppResult};
