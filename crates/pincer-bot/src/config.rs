//! Application configuration.

use crate::error::{AppError, AppResult};
use pincer_detector::StrategyConfig;
use pincer_engine::EngineConfig;
use pincer_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Detect and log opportunities without placing orders.
    #[default]
    Observe,
    /// Live trading enabled.
    Trade,
}

/// REST endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// recvWindow for signed requests (ms).
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
}

fn default_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_recv_window_ms() -> u64 {
    5000
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            recv_window_ms: default_recv_window_ms(),
        }
    }
}

/// WebSocket configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnection backoff (ms).
    pub reconnect_base_delay_ms: u64,
    /// Force a reconnect when no frame arrives within this window (ms).
    pub idle_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: 1000,
            idle_timeout_ms: 60000,
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            url: String::new(), // Set separately
            streams: Vec::new(), // Set separately from the strategy
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: 60000,
            idle_timeout_ms: cfg.idle_timeout_ms,
        }
    }
}

/// API credentials for the signed order endpoints.
///
/// Supplied through the environment only, never the config file. No
/// Debug impl so the secret cannot end up in a log line.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    /// Read credentials from `PINCER_API_KEY` / `PINCER_API_SECRET`.
    pub fn from_env() -> AppResult<Self> {
        let api_key = std::env::var("PINCER_API_KEY").map_err(|_| {
            AppError::Config("PINCER_API_KEY not set (required for trade mode)".to_string())
        })?;
        let api_secret = std::env::var("PINCER_API_SECRET").map_err(|_| {
            AppError::Config("PINCER_API_SECRET not set (required for trade mode)".to_string())
        })?;

        if api_key.is_empty() || api_secret.is_empty() {
            return Err(AppError::Config(
                "API credentials must not be empty".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            api_secret,
        })
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Operating mode.
    pub mode: OperatingMode,
    /// WebSocket endpoint URL of the combined stream.
    pub ws_url: String,
    /// REST endpoint configuration.
    #[serde(default)]
    pub venue: VenueConfig,
    /// Strategy configuration.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Order lifecycle engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// WebSocket configuration.
    #[serde(default)]
    pub websocket: WsConfig,
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.ws_url.is_empty() {
            return Err(AppError::Config("ws_url must not be empty".to_string()));
        }
        self.strategy.validate().map_err(AppError::Config)?;
        self.engine.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// Check if in observe mode.
    pub fn is_observe_mode(&self) -> bool {
        self.mode == OperatingMode::Observe
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Observe,
            ws_url: "wss://stream.binance.com:9443/stream".to_string(),
            venue: VenueConfig::default(),
            strategy: StrategyConfig::default(),
            engine: EngineConfig::default(),
            websocket: WsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pincer_core::Symbol;
    use pincer_detector::StrategyKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.is_observe_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            mode = "observe"
            ws_url = "wss://stream.example.com/stream"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, OperatingMode::Observe);
        assert_eq!(config.venue.recv_window_ms, 5000);
        assert_eq!(config.strategy.target_delta, dec!(0.25));
        assert_eq!(config.engine.retry_attempts, 3);
    }

    #[test]
    fn test_trade_mode_with_strategy_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            mode = "trade"
            ws_url = "wss://stream.example.com/stream"

            [strategy]
            strategy = "momentum"
            self_symbol = "ETHUSD"
            peer_symbol = ""
            fixed_spread = "0.20"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, OperatingMode::Trade);
        assert_eq!(config.strategy.strategy, StrategyKind::Momentum);
        assert_eq!(config.strategy.self_symbol, Symbol::from("ETHUSD"));
        assert_eq!(config.strategy.fixed_spread, dec!(0.20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_ws_url_rejected() {
        let config = AppConfig {
            ws_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("mode"));
        assert!(toml_str.contains("ws_url"));
    }
}
