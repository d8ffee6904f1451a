//! Engine configuration.

use pincer_core::OrderType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the order lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attempts allowed per lifecycle step before its fallback runs.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Pause between retry attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Status polls of an open entry order before it is canceled.
    #[serde(default = "default_entry_poll_attempts")]
    pub entry_poll_attempts: u32,
    /// Pause between entry polls, in milliseconds.
    #[serde(default = "default_entry_poll_interval_ms")]
    pub entry_poll_interval_ms: u64,
    /// Status polls of an open exit order before the market fallback.
    #[serde(default = "default_exit_poll_attempts")]
    pub exit_poll_attempts: u32,
    /// Pause between exit polls, in milliseconds.
    #[serde(default = "default_exit_poll_interval_ms")]
    pub exit_poll_interval_ms: u64,
    /// Fraction of the requested entry quantity that commits the
    /// position before the order is fully filled.
    #[serde(default = "default_partial_fill_ratio")]
    pub partial_fill_ratio: Decimal,
    /// How the exit leg is posted: a resting LIMIT at the detected
    /// exit price, or MARKET for guaranteed realization.
    #[serde(default = "default_exit_order_type")]
    pub exit_order_type: OrderType,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_entry_poll_attempts() -> u32 {
    10
}

fn default_entry_poll_interval_ms() -> u64 {
    1_000
}

fn default_exit_poll_attempts() -> u32 {
    30
}

fn default_exit_poll_interval_ms() -> u64 {
    1_000
}

fn default_partial_fill_ratio() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_exit_order_type() -> OrderType {
    OrderType::Limit
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            entry_poll_attempts: default_entry_poll_attempts(),
            entry_poll_interval_ms: default_entry_poll_interval_ms(),
            exit_poll_attempts: default_exit_poll_attempts(),
            exit_poll_interval_ms: default_exit_poll_interval_ms(),
            partial_fill_ratio: default_partial_fill_ratio(),
            exit_order_type: default_exit_order_type(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".to_string());
        }
        if self.entry_poll_attempts == 0 || self.exit_poll_attempts == 0 {
            return Err("poll attempts must be at least 1".to_string());
        }
        if self.partial_fill_ratio <= Decimal::ZERO || self.partial_fill_ratio > Decimal::ONE {
            return Err(format!(
                "partial_fill_ratio ({}) must be within (0, 1]",
                self.partial_fill_ratio
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn entry_poll_interval(&self) -> Duration {
        Duration::from_millis(self.entry_poll_interval_ms)
    }

    pub fn exit_poll_interval(&self) -> Duration {
        Duration::from_millis(self.exit_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.partial_fill_ratio, dec!(0.5));
        assert_eq!(config.exit_order_type, OrderType::Limit);
    }

    #[test]
    fn test_ratio_bounds() {
        let config = EngineConfig {
            partial_fill_ratio: dec!(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            partial_fill_ratio: dec!(1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            partial_fill_ratio: dec!(1),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = EngineConfig {
            retry_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
