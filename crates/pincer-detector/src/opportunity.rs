//! Detected opportunity type.

use crate::config::StrategyKind;
use chrono::{DateTime, Utc};
use pincer_core::{Price, Size, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradeable price condition captured from one tick.
///
/// Derived from the freshest cached quotes, valid only for the tick
/// that produced it. The entry leg buys `buy_symbol` at `buy_price`;
/// the exit leg sells `sell_symbol` at `sell_price`. In the arbitrage
/// variant the two symbols differ, in the momentum variant they are
/// the same.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Rule that produced this opportunity.
    pub strategy: StrategyKind,
    /// Symbol the entry order buys.
    pub buy_symbol: Symbol,
    /// Entry price, the best ask observed on the buy symbol.
    pub buy_price: Price,
    /// Symbol the exit order sells.
    pub sell_symbol: Symbol,
    /// Chosen exit price.
    pub sell_price: Price,
    /// Quantity shared by both legs.
    pub quantity: Size,
    /// Per-unit edge: the winning diff net of the threshold for
    /// arbitrage, the fixed spread for momentum.
    pub edge: Decimal,
    /// Detection timestamp.
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Create a new opportunity stamped with the current time.
    pub fn new(
        strategy: StrategyKind,
        buy_symbol: Symbol,
        buy_price: Price,
        sell_symbol: Symbol,
        sell_price: Price,
        quantity: Size,
        edge: Decimal,
    ) -> Self {
        Self {
            strategy,
            buy_symbol,
            buy_price,
            sell_symbol,
            sell_price,
            quantity,
            edge,
            detected_at: Utc::now(),
        }
    }

    /// Entry notional in quote currency.
    pub fn notional(&self) -> Decimal {
        self.quantity.notional(self.buy_price)
    }

    /// Profit if both legs fill at their detected prices.
    pub fn expected_profit(&self) -> Decimal {
        (self.sell_price.inner() - self.buy_price.inner()) * self.quantity.inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Opportunity {
        Opportunity::new(
            StrategyKind::Arbitrage,
            Symbol::from("BTCBUSD"),
            Price::new(dec!(98.00)),
            Symbol::from("BTCUSD"),
            Price::new(dec!(99.90)),
            Size::new(dec!(0.15)),
            dec!(1.65),
        )
    }

    #[test]
    fn test_notional() {
        assert_eq!(sample().notional(), dec!(14.7000));
    }

    #[test]
    fn test_expected_profit_uses_leg_prices() {
        // 1.90 gross spread per unit, not the post-threshold edge.
        assert_eq!(sample().expected_profit(), dec!(0.2850));
    }
}
