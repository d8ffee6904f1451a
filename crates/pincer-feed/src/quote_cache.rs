//! Latest-quote cache.
//!
//! Holds the most recent top-of-book quote per symbol. Each update
//! replaces the previous quote wholesale; last write wins.

use dashmap::DashMap;
use pincer_core::{Quote, Symbol};

/// Concurrent map of symbol to latest quote.
pub struct QuoteCache {
    quotes: DashMap<Symbol, Quote>,
}

impl QuoteCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            quotes: DashMap::new(),
        }
    }

    /// Store a quote, replacing any previous one for the symbol.
    pub fn update(&self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    /// Get the latest quote for a symbol.
    pub fn get(&self, symbol: &Symbol) -> Option<Quote> {
        self.quotes.get(symbol).map(|entry| entry.clone())
    }

    /// Get the latest quotes for two symbols, or `None` unless both
    /// have been seen.
    pub fn get_pair(&self, first: &Symbol, second: &Symbol) -> Option<(Quote, Quote)> {
        Some((self.get(first)?, self.get(second)?))
    }

    /// Number of symbols with a cached quote.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pincer_core::{Price, Size};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, bid: Decimal, ask: Decimal) -> Quote {
        Quote::new(
            Symbol::from(symbol),
            Price::new(bid),
            Size::new(dec!(1)),
            Price::new(ask),
            Size::new(dec!(1)),
        )
    }

    #[test]
    fn test_update_and_get() {
        let cache = QuoteCache::new();
        assert!(cache.is_empty());

        cache.update(quote("BTCUSD", dec!(99.90), dec!(100.00)));

        let got = cache.get(&Symbol::from("BTCUSD")).unwrap();
        assert_eq!(got.bid_price, Price::new(dec!(99.90)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = QuoteCache::new();

        cache.update(quote("BTCUSD", dec!(99.90), dec!(100.00)));
        cache.update(quote("BTCUSD", dec!(99.95), dec!(100.05)));

        let got = cache.get(&Symbol::from("BTCUSD")).unwrap();
        assert_eq!(got.bid_price, Price::new(dec!(99.95)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_missing_symbol() {
        let cache = QuoteCache::new();
        assert!(cache.get(&Symbol::from("BTCUSD")).is_none());
    }

    #[test]
    fn test_get_pair_requires_both() {
        let cache = QuoteCache::new();
        let self_sym = Symbol::from("BTCBUSD");
        let peer_sym = Symbol::from("BTCUSD");

        cache.update(quote("BTCBUSD", dec!(97.90), dec!(98.00)));
        assert!(cache.get_pair(&self_sym, &peer_sym).is_none());

        cache.update(quote("BTCUSD", dec!(99.90), dec!(100.00)));
        let (a, b) = cache.get_pair(&self_sym, &peer_sym).unwrap();
        assert_eq!(a.symbol, self_sym);
        assert_eq!(b.symbol, peer_sym);
    }
}
