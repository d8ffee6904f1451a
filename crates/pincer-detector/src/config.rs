//! Strategy configuration.

use pincer_core::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which detection rule runs on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Two-symbol spread capture: buy the cheap leg, sell the rich leg.
    Arbitrage,
    /// Single-symbol entry with a fixed-spread exit parked above it.
    Momentum,
}

/// Configuration for opportunity detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Active detection rule.
    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,
    /// Primary traded symbol.
    pub self_symbol: Symbol,
    /// Reference symbol for the arbitrage comparison.
    ///
    /// Ignored by the momentum rule.
    pub peer_symbol: Symbol,
    /// Minimum spread between the legs before arbitrage fires.
    #[serde(default = "default_target_delta")]
    pub target_delta: Decimal,
    /// Offset added to the entry price to form the momentum exit price.
    #[serde(default = "default_fixed_spread")]
    pub fixed_spread: Decimal,
    /// Notional budget per trade, in quote currency.
    #[serde(default = "default_trade_notional")]
    pub trade_notional: Decimal,
}

fn default_strategy() -> StrategyKind {
    StrategyKind::Arbitrage
}

fn default_target_delta() -> Decimal {
    Decimal::new(25, 2) // 0.25 quote units between the legs
}

fn default_fixed_spread() -> Decimal {
    Decimal::new(10, 2) // 0.10 quote units above entry
}

fn default_trade_notional() -> Decimal {
    Decimal::from(15) // just above the venue's $10 minimum
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            self_symbol: Symbol::from("BTCUSD"),
            peer_symbol: Symbol::from("BTCBUSD"),
            target_delta: default_target_delta(),
            fixed_spread: default_fixed_spread(),
            trade_notional: default_trade_notional(),
        }
    }
}

impl StrategyConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.self_symbol.as_str().is_empty() {
            return Err("self_symbol must not be empty".to_string());
        }

        if self.trade_notional <= Decimal::ZERO {
            return Err(format!(
                "trade_notional ({}) must be positive",
                self.trade_notional
            ));
        }

        match self.strategy {
            StrategyKind::Arbitrage => {
                if self.peer_symbol.as_str().is_empty() {
                    return Err("peer_symbol must not be empty for arbitrage".to_string());
                }
                if self.self_symbol == self.peer_symbol {
                    return Err(format!(
                        "self_symbol and peer_symbol must differ (both {})",
                        self.self_symbol
                    ));
                }
                if self.target_delta.is_sign_negative() {
                    return Err(format!(
                        "target_delta ({}) must be non-negative",
                        self.target_delta
                    ));
                }
            }
            StrategyKind::Momentum => {
                if self.fixed_spread <= Decimal::ZERO {
                    return Err(format!(
                        "fixed_spread ({}) must be positive for momentum",
                        self.fixed_spread
                    ));
                }
            }
        }

        Ok(())
    }

    /// Symbols this strategy needs live quotes for.
    pub fn symbols(&self) -> Vec<Symbol> {
        match self.strategy {
            StrategyKind::Arbitrage => vec![self.self_symbol.clone(), self.peer_symbol.clone()],
            StrategyKind::Momentum => vec![self.self_symbol.clone()],
        }
    }

    /// Stream names to subscribe to, one book-ticker stream per symbol.
    pub fn stream_names(&self) -> Vec<String> {
        self.symbols()
            .iter()
            .map(|s| format!("{}@bookTicker", s.as_str().to_lowercase()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, StrategyKind::Arbitrage);
        assert_eq!(config.target_delta, dec!(0.25));
    }

    #[test]
    fn test_same_symbols_rejected() {
        let config = StrategyConfig {
            peer_symbol: Symbol::from("BTCUSD"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_momentum_ignores_peer() {
        let config = StrategyConfig {
            strategy: StrategyKind::Momentum,
            peer_symbol: Symbol::from("BTCUSD"),
            ..Default::default()
        };
        // Same peer as self is fine when the rule never compares them.
        assert!(config.validate().is_ok());
        assert_eq!(config.symbols(), vec![Symbol::from("BTCUSD")]);
    }

    #[test]
    fn test_negative_delta_rejected() {
        let config = StrategyConfig {
            target_delta: dec!(-0.10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stream_names_lowercased() {
        let config = StrategyConfig::default();
        let streams = config.stream_names();
        assert_eq!(streams, vec!["btcusd@bookTicker", "btcbusd@bookTicker"]);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: StrategyConfig = serde_json::from_str(
            r#"{"self_symbol": "ETHUSD", "peer_symbol": "ETHBUSD"}"#,
        )
        .unwrap();
        assert_eq!(config.strategy, StrategyKind::Arbitrage);
        assert_eq!(config.trade_notional, dec!(15));
    }
}
