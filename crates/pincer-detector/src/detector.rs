//! Opportunity detection over the live quote cache.
//!
//! Runs once per applied tick: reads the freshest quotes, applies the
//! configured rule, and sizes the result against the venue's lot and
//! notional filters. Anything that survives is handed to the execution
//! engine as-is.

use crate::config::{StrategyConfig, StrategyKind};
use crate::opportunity::Opportunity;
use pincer_core::{Price, RuleBook, Size, Symbol};
use pincer_feed::QuoteCache;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Counters for detector activity.
#[derive(Debug, Default)]
pub struct DetectorStats {
    /// Ticks examined for an opportunity.
    pub check_count: AtomicU64,
    /// Edges found but sized below the venue floors.
    pub rejection_count: AtomicU64,
}

impl DetectorStats {
    pub fn record_check(&self) {
        self.check_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejection_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checks(&self) -> u64 {
        self.check_count.load(Ordering::Relaxed)
    }

    pub fn rejections(&self) -> u64 {
        self.rejection_count.load(Ordering::Relaxed)
    }
}

/// Opportunity detector.
///
/// Arbitrage rule: with self quote S and peer quote P, compute
/// `diff_a = P.bid - S.ask - target_delta` and
/// `diff_b = S.bid - P.ask - target_delta`. The direction with the
/// larger positive value buys the crossed ask and sells the opposite
/// bid; `diff_a` wins a tie.
///
/// Momentum rule: buy the best ask unconditionally and park the exit
/// at `entry + fixed_spread` on the same symbol.
pub struct Detector {
    config: StrategyConfig,
    rules: RuleBook,
    stats: DetectorStats,
}

impl Detector {
    /// Create a detector with venue rules for sizing.
    pub fn new(config: StrategyConfig, rules: RuleBook) -> Self {
        Self {
            config,
            rules,
            stats: DetectorStats::default(),
        }
    }

    /// Check the cache for a tradeable opportunity.
    ///
    /// Returns Some only when an edge exists and the sized quantity
    /// clears the venue minimums.
    pub fn check(&self, cache: &QuoteCache) -> Option<Opportunity> {
        self.stats.record_check();

        match self.config.strategy {
            StrategyKind::Arbitrage => self.check_arbitrage(cache),
            StrategyKind::Momentum => self.check_momentum(cache),
        }
    }

    fn check_arbitrage(&self, cache: &QuoteCache) -> Option<Opportunity> {
        let (own, peer) = cache.get_pair(&self.config.self_symbol, &self.config.peer_symbol)?;
        if !own.is_valid() || !peer.is_valid() {
            return None;
        }

        let delta = self.config.target_delta;
        let diff_a = peer.bid_price.inner() - own.ask_price.inner() - delta;
        let diff_b = own.bid_price.inner() - peer.ask_price.inner() - delta;

        if diff_a <= Decimal::ZERO && diff_b <= Decimal::ZERO {
            return None;
        }

        // diff_a buys own at its ask and exits into peer's bid; diff_b
        // is the reverse. diff_a wins a tie.
        let (edge, entry, exit) = if diff_a >= diff_b {
            (diff_a, &own, &peer)
        } else {
            (diff_b, &peer, &own)
        };

        let book_cap = entry.ask_qty.min(exit.bid_qty);
        let quantity = self.sized_quantity(&entry.symbol, entry.ask_price, book_cap)?;

        info!(
            strategy = "arbitrage",
            buy_symbol = %entry.symbol,
            buy_price = %entry.ask_price,
            sell_symbol = %exit.symbol,
            sell_price = %exit.bid_price,
            quantity = %quantity,
            edge = %edge,
            "Arbitrage opportunity"
        );

        Some(Opportunity::new(
            StrategyKind::Arbitrage,
            entry.symbol.clone(),
            entry.ask_price,
            exit.symbol.clone(),
            exit.bid_price,
            quantity,
            edge,
        ))
    }

    fn check_momentum(&self, cache: &QuoteCache) -> Option<Opportunity> {
        let quote = cache.get(&self.config.self_symbol)?;
        if !quote.is_valid() {
            return None;
        }

        let entry = quote.ask_price;
        let exit = Price::new(entry.inner() + self.config.fixed_spread);
        let quantity = self.sized_quantity(&quote.symbol, entry, quote.ask_qty)?;

        info!(
            strategy = "momentum",
            symbol = %quote.symbol,
            buy_price = %entry,
            sell_price = %exit,
            quantity = %quantity,
            "Momentum entry"
        );

        Some(Opportunity::new(
            StrategyKind::Momentum,
            quote.symbol.clone(),
            entry,
            quote.symbol.clone(),
            exit,
            quantity,
            self.config.fixed_spread,
        ))
    }

    /// Size a trade as the notional budget floored to the lot grid,
    /// capped by what the book displays, then checked against the
    /// venue floors.
    fn sized_quantity(&self, symbol: &Symbol, entry_price: Price, book_cap: Size) -> Option<Size> {
        let rules = match self.rules.get(symbol) {
            Some(r) => r,
            None => {
                warn!(symbol = %symbol, "No venue rules for symbol, skipping");
                return None;
            }
        };

        let budget = Size::new(self.config.trade_notional / entry_price.inner());
        let quantity = rules.round_qty(budget).min(book_cap);

        if !rules.meets_minimums(entry_price, quantity) {
            debug!(
                symbol = %symbol,
                quantity = %quantity,
                price = %entry_price,
                "Edge found but sized below venue minimums"
            );
            self.stats.record_rejection();
            return None;
        }

        Some(quantity)
    }

    /// Get current configuration.
    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Get activity counters.
    pub fn stats(&self) -> &DetectorStats {
        &self.stats
    }
}
