//! Symbol identification and per-symbol venue rules.
//!
//! Every order must land on the venue's price and quantity grids and
//! clear its notional floor, or the venue rejects it outright. The
//! rules live here so sizing and rounding share one implementation.

use crate::order::OrderSide;
use crate::{Price, Size};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Venue trading symbol (e.g. "BTCUSD").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Order constraints the venue publishes per symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRules {
    /// Minimum price increment.
    pub tick_size: Price,

    /// Minimum quantity increment.
    pub step_size: Size,

    /// Smallest order quantity accepted.
    pub min_qty: Size,

    /// Smallest `price * quantity` accepted.
    pub min_notional: Decimal,
}

impl SymbolRules {
    /// Round a price onto the tick grid, toward the unfavorable side.
    ///
    /// Buys round up and sells round down, so the rounded order is at
    /// least as marketable as the requested one.
    #[must_use]
    pub fn round_price(&self, price: Price, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => price.ceil_to_tick(self.tick_size),
            OrderSide::Sell => price.floor_to_tick(self.tick_size),
        }
    }

    /// Round a quantity down onto the step grid.
    #[must_use]
    pub fn round_qty(&self, qty: Size) -> Size {
        qty.floor_to_step(self.step_size)
    }

    /// Check an order against the quantity and notional floors.
    #[must_use]
    pub fn meets_minimums(&self, price: Price, qty: Size) -> bool {
        qty >= self.min_qty && qty.notional(price) >= self.min_notional
    }
}

impl Default for SymbolRules {
    fn default() -> Self {
        Self {
            tick_size: Price::new(dec!(0.01)),
            step_size: Size::new(dec!(0.001)),
            min_qty: Size::new(dec!(0.001)),
            min_notional: dec!(10),
        }
    }
}

/// Symbol rules keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: HashMap<Symbol, SymbolRules>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, rules: SymbolRules) {
        self.rules.insert(symbol, rules);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&SymbolRules> {
        self.rules.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_display_and_eq() {
        let a = Symbol::from("BTCUSD");
        let b = Symbol::new("BTCUSD");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "BTCUSD");
    }

    #[test]
    fn test_round_price_directional() {
        let rules = SymbolRules::default();
        let price = Price::new(dec!(99.906));

        // Buy rounds up, sell rounds down.
        assert_eq!(
            rules.round_price(price, OrderSide::Buy),
            Price::new(dec!(99.91))
        );
        assert_eq!(
            rules.round_price(price, OrderSide::Sell),
            Price::new(dec!(99.90))
        );
    }

    #[test]
    fn test_round_qty_floors() {
        let rules = SymbolRules::default();
        let qty = Size::new(dec!(0.102040));

        assert_eq!(rules.round_qty(qty), Size::new(dec!(0.102)));
    }

    #[test]
    fn test_meets_minimums() {
        let rules = SymbolRules::default();

        // 0.2 * 100 = 20 notional, above the floor of 10.
        assert!(rules.meets_minimums(Price::new(dec!(100)), Size::new(dec!(0.2))));

        // 0.05 * 100 = 5 notional, below the floor.
        assert!(!rules.meets_minimums(Price::new(dec!(100)), Size::new(dec!(0.05))));

        // Quantity below min_qty fails even with enough notional.
        assert!(!rules.meets_minimums(Price::new(dec!(100000)), Size::new(dec!(0.0001))));
    }

    #[test]
    fn test_rule_book_lookup() {
        let mut book = RuleBook::new();
        assert!(book.is_empty());

        book.insert(Symbol::from("BTCUSD"), SymbolRules::default());

        assert_eq!(book.len(), 1);
        assert!(book.get(&Symbol::from("BTCUSD")).is_some());
        assert!(book.get(&Symbol::from("BTCBUSD")).is_none());
    }
}
