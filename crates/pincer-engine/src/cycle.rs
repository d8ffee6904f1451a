//! One order lifecycle cycle.
//!
//! A cycle owns a detected opportunity from entry posting to a
//! terminal state: post the entry, monitor it, commit or walk away,
//! post the exit, and fall back to a market close when the planned
//! exit cannot be realized. Every venue interaction runs under a
//! bounded per-step retry budget.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::lock::CycleGuard;
use crate::retry::RetryBudget;
use crate::venue_api::DynOrderApi;
use pincer_core::{Order, OrderSide, OrderStatus, OrderType, Size};
use pincer_detector::Opportunity;
use pincer_venue::{OrderRequest, VenueError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ============================================================================
// CycleState
// ============================================================================

/// Lifecycle position of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Entry order being posted.
    EntryPending,
    /// Entry order live, waiting for fills.
    EntryMonitoring,
    /// Exit order being posted.
    ExitPending,
    /// Exit order live, waiting for fills.
    ExitMonitoring,
    /// Terminal: cycle ran to completion.
    Resolved,
    /// Terminal: cycle abandoned.
    Aborted,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntryPending => "entry_pending",
            Self::EntryMonitoring => "entry_monitoring",
            Self::ExitPending => "exit_pending",
            Self::ExitMonitoring => "exit_monitoring",
            Self::Resolved => "resolved",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CycleOutcome
// ============================================================================

/// How a finished cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Position entered and exited at the planned prices.
    Captured {
        /// Quantity realized through the planned exit.
        quantity: Size,
    },
    /// Position closed through a market fallback rather than the
    /// planned exit.
    Liquidated {
        /// Quantity sold at market.
        quantity: Size,
    },
    /// Entry never executed; no position was taken.
    NoFill,
    /// Cycle abandoned; the reason says what went wrong.
    Aborted {
        /// Human-readable cause.
        reason: String,
    },
}

// ============================================================================
// LifecycleEngine
// ============================================================================

/// Drives one cycle at a time against the venue.
pub struct LifecycleEngine {
    api: DynOrderApi,
    config: EngineConfig,
    cycle_seq: AtomicU64,
}

impl LifecycleEngine {
    pub fn new(api: DynOrderApi, config: EngineConfig) -> Self {
        Self {
            api,
            config,
            cycle_seq: AtomicU64::new(0),
        }
    }

    /// Run one full cycle for a detected opportunity.
    ///
    /// The guard is held until the cycle reaches a terminal state and
    /// returned exactly once on every path out, the fatal one
    /// included.
    pub async fn run_cycle(
        &self,
        opportunity: Opportunity,
        guard: CycleGuard,
    ) -> EngineResult<CycleOutcome> {
        let cycle_id = self.cycle_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut cycle = Cycle {
            id: cycle_id,
            opportunity,
            api: &self.api,
            config: &self.config,
            state: CycleState::EntryPending,
            residual: None,
        };

        info!(
            cycle_id,
            buy_symbol = %cycle.opportunity.buy_symbol,
            buy_price = %cycle.opportunity.buy_price,
            sell_symbol = %cycle.opportunity.sell_symbol,
            sell_price = %cycle.opportunity.sell_price,
            quantity = %cycle.opportunity.quantity,
            "Cycle started"
        );

        let result = cycle.run().await;
        cycle.join_residual().await;

        match &result {
            Ok(outcome) => info!(cycle_id, outcome = ?outcome, "Cycle finished"),
            Err(e) => error!(cycle_id, error = %e, "Cycle failed fatally"),
        }

        guard.release();
        result
    }
}

// ============================================================================
// Cycle internals
// ============================================================================

/// Result of trying to get an order onto the venue.
enum PostOutcome {
    /// The venue accepted the order.
    Placed(Order),
    /// The step gave up with the venue confirming nothing landed.
    NotPlaced,
    /// The step gave up with the last attempt's fate unresolved.
    Indeterminate,
}

/// Verdict on whether a failed post attempt actually landed.
enum Confirm {
    /// Venue does not know the id; safe to post again.
    Unplaced,
    /// The attempt landed; this is the live order.
    Landed(Order),
    /// Could not find out.
    Unknown,
}

/// What entry monitoring concluded.
enum EntryResolution {
    /// A position exists; exit at the planned price.
    Committed { quantity: Size },
    /// Entry canceled holding a sub-threshold partial; close it at
    /// market instead of the planned exit.
    CanceledWithPartial { quantity: Size },
    /// Nothing executed.
    NoPosition,
    /// Entry state could not be settled.
    Abandoned { reason: String },
}

struct Cycle<'a> {
    id: u64,
    opportunity: Opportunity,
    api: &'a DynOrderApi,
    config: &'a EngineConfig,
    state: CycleState,
    residual: Option<JoinHandle<Option<Size>>>,
}

impl Cycle<'_> {
    fn enter(&mut self, state: CycleState) {
        debug!(cycle_id = self.id, from = %self.state, to = %state, "Cycle transition");
        self.state = state;
    }

    async fn run(&mut self) -> EngineResult<CycleOutcome> {
        let request = OrderRequest::limit(
            self.opportunity.buy_symbol.clone(),
            OrderSide::Buy,
            self.opportunity.buy_price,
            self.opportunity.quantity,
        );

        let entry = match self.post_with_retry(request.clone()).await? {
            PostOutcome::Placed(order) => order,
            PostOutcome::NotPlaced => {
                self.enter(CycleState::Aborted);
                return Ok(CycleOutcome::Aborted {
                    reason: "entry rejected".to_string(),
                });
            }
            PostOutcome::Indeterminate => {
                if let Some(canceled) = self.cleanup_indeterminate_entry(&request).await {
                    if !canceled.executed_qty.is_zero() {
                        self.enter(CycleState::ExitPending);
                        return self.run_exit(canceled.executed_qty, true).await;
                    }
                    self.enter(CycleState::Resolved);
                    return Ok(CycleOutcome::NoFill);
                }
                self.enter(CycleState::Aborted);
                return Ok(CycleOutcome::Aborted {
                    reason: "entry state unresolved".to_string(),
                });
            }
        };

        self.enter(CycleState::EntryMonitoring);
        match self.monitor_entry(entry).await? {
            EntryResolution::Committed { quantity } => {
                self.enter(CycleState::ExitPending);
                self.run_exit(quantity, false).await
            }
            EntryResolution::CanceledWithPartial { quantity } => {
                self.enter(CycleState::ExitPending);
                self.run_exit(quantity, true).await
            }
            EntryResolution::NoPosition => {
                self.enter(CycleState::Resolved);
                Ok(CycleOutcome::NoFill)
            }
            EntryResolution::Abandoned { reason } => {
                self.enter(CycleState::Aborted);
                Ok(CycleOutcome::Aborted { reason })
            }
        }
    }

    /// Post an order under the step's retry budget.
    ///
    /// A transient failure leaves the attempt's fate open, so before
    /// any re-post the venue is asked whether the id landed; the same
    /// id is only posted again once the venue says it is unknown.
    async fn post_with_retry(&self, request: OrderRequest) -> EngineResult<PostOutcome> {
        let mut budget = RetryBudget::new(self.config.retry_attempts, self.config.retry_delay());

        loop {
            match self.api.place_order(request.clone()).await {
                Ok(order) => return Ok(PostOutcome::Placed(order)),
                Err(VenueError::Fatal(msg)) => return Err(EngineError::Fatal(msg)),
                Err(VenueError::RateLimited { retry_after }) => {
                    if !budget.consume() {
                        warn!(cycle_id = self.id, "Post attempts exhausted while rate limited");
                        return Ok(PostOutcome::NotPlaced);
                    }
                    warn!(
                        cycle_id = self.id,
                        wait_ms = retry_after.as_millis() as u64,
                        "Rate limited, honoring venue wait"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                Err(VenueError::Transient(msg)) => {
                    debug!(cycle_id = self.id, error = %msg, "Transient post failure");
                    match self.confirm_unplaced(&request, &mut budget).await? {
                        Confirm::Landed(order) => {
                            info!(
                                cycle_id = self.id,
                                client_order_id = %request.client_order_id,
                                "Prior post attempt landed, adopting the order"
                            );
                            return Ok(PostOutcome::Placed(order));
                        }
                        Confirm::Unplaced => {
                            if !budget.consume() {
                                warn!(cycle_id = self.id, "Post attempts exhausted");
                                return Ok(PostOutcome::NotPlaced);
                            }
                            tokio::time::sleep(budget.delay()).await;
                        }
                        Confirm::Unknown => return Ok(PostOutcome::Indeterminate),
                    }
                }
                Err(VenueError::AlreadyResolved) => {
                    warn!(cycle_id = self.id, "Unexpected unknown-order reply to a post");
                    return Ok(PostOutcome::NotPlaced);
                }
                Err(VenueError::Client { code, msg }) => {
                    warn!(cycle_id = self.id, code, error = %msg, "Order rejected");
                    return Ok(PostOutcome::NotPlaced);
                }
            }
        }
    }

    /// Ask the venue whether a failed post attempt landed.
    async fn confirm_unplaced(
        &self,
        request: &OrderRequest,
        budget: &mut RetryBudget,
    ) -> EngineResult<Confirm> {
        loop {
            match self
                .api
                .get_order_status(request.symbol.clone(), request.client_order_id.clone())
                .await
            {
                Ok(order) => return Ok(Confirm::Landed(order)),
                Err(VenueError::AlreadyResolved) => return Ok(Confirm::Unplaced),
                Err(VenueError::Fatal(msg)) => return Err(EngineError::Fatal(msg)),
                Err(VenueError::RateLimited { retry_after }) => {
                    if !budget.consume() {
                        return Ok(Confirm::Unknown);
                    }
                    tokio::time::sleep(retry_after).await;
                }
                Err(VenueError::Transient(msg)) => {
                    if !budget.consume() {
                        warn!(
                            cycle_id = self.id,
                            error = %msg,
                            "Could not confirm the fate of a post attempt"
                        );
                        return Ok(Confirm::Unknown);
                    }
                    tokio::time::sleep(budget.delay()).await;
                }
                Err(VenueError::Client { code, msg }) => {
                    warn!(cycle_id = self.id, code, error = %msg, "Status check rejected");
                    return Ok(Confirm::Unknown);
                }
            }
        }
    }

    /// Best-effort cancel of an entry whose placement was never
    /// confirmed, so no orphan order keeps resting.
    ///
    /// A successful cancel settles the question: the reply proves the
    /// post landed and carries whatever quantity executed before the
    /// cancel took hold.
    async fn cleanup_indeterminate_entry(&self, request: &OrderRequest) -> Option<Order> {
        match self
            .api
            .cancel_order(request.symbol.clone(), request.client_order_id.clone())
            .await
        {
            Ok(canceled) => {
                warn!(
                    cycle_id = self.id,
                    executed = %canceled.executed_qty,
                    "Unconfirmed entry was resting, canceled"
                );
                Some(canceled)
            }
            Err(VenueError::AlreadyResolved) => {
                debug!(cycle_id = self.id, "Unconfirmed entry not on the venue");
                None
            }
            Err(e) => {
                error!(
                    cycle_id = self.id,
                    client_order_id = %request.client_order_id,
                    error = %e,
                    "Unconfirmed entry cleanup failed"
                );
                None
            }
        }
    }

    /// Watch the entry order until it commits a position, walks away
    /// clean, or has to be canceled.
    ///
    /// The order state returned by the post itself counts as the
    /// first observation; venues often report fills synchronously.
    async fn monitor_entry(&mut self, mut order: Order) -> EngineResult<EntryResolution> {
        let mut polls = RetryBudget::new(
            self.config.entry_poll_attempts,
            self.config.entry_poll_interval(),
        );

        loop {
            match order.status {
                OrderStatus::Filled => {
                    info!(cycle_id = self.id, executed = %order.executed_qty, "Entry filled");
                    return Ok(EntryResolution::Committed {
                        quantity: order.executed_qty,
                    });
                }
                OrderStatus::PartiallyFilled
                    if order.fill_ratio() >= self.config.partial_fill_ratio =>
                {
                    info!(
                        cycle_id = self.id,
                        executed = %order.executed_qty,
                        residual = %order.remaining(),
                        "Entry partial commits the position"
                    );
                    self.spawn_residual_cancel(&order);
                    return Ok(EntryResolution::Committed {
                        quantity: order.executed_qty,
                    });
                }
                OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Rejected => {
                    // The venue closed it without us; keep whatever
                    // executed before that happened.
                    warn!(
                        cycle_id = self.id,
                        status = ?order.status,
                        executed = %order.executed_qty,
                        "Entry closed by the venue"
                    );
                    if order.executed_qty.is_zero() {
                        return Ok(EntryResolution::NoPosition);
                    }
                    return Ok(EntryResolution::CanceledWithPartial {
                        quantity: order.executed_qty,
                    });
                }
                _ => {}
            }

            if !polls.consume() {
                return self.cancel_entry(order).await;
            }
            tokio::time::sleep(polls.delay()).await;

            match self
                .api
                .get_order_status(order.symbol.clone(), order.client_order_id.clone())
                .await
            {
                Ok(fresh) => order = fresh,
                Err(VenueError::Fatal(msg)) => return Err(EngineError::Fatal(msg)),
                Err(VenueError::RateLimited { retry_after }) => {
                    warn!(cycle_id = self.id, "Rate limited while polling entry");
                    tokio::time::sleep(retry_after).await;
                }
                Err(e) => {
                    debug!(cycle_id = self.id, error = %e, "Entry poll failed");
                }
            }
        }
    }

    /// Cancel an entry that never committed.
    async fn cancel_entry(&mut self, order: Order) -> EngineResult<EntryResolution> {
        info!(
            cycle_id = self.id,
            client_order_id = %order.client_order_id,
            "Entry unfilled after polling, canceling"
        );
        let mut budget = RetryBudget::new(self.config.retry_attempts, self.config.retry_delay());

        loop {
            match self
                .api
                .cancel_order(order.symbol.clone(), order.client_order_id.clone())
                .await
            {
                Ok(canceled) => {
                    let executed = canceled.executed_qty;
                    if executed.is_zero() {
                        info!(cycle_id = self.id, "Entry canceled clean, no position");
                        return Ok(EntryResolution::NoPosition);
                    }
                    info!(
                        cycle_id = self.id,
                        executed = %executed,
                        "Entry canceled holding a partial"
                    );
                    return Ok(EntryResolution::CanceledWithPartial { quantity: executed });
                }
                Err(VenueError::AlreadyResolved) => {
                    // The cancel raced a fill; the whole entry is ours.
                    info!(cycle_id = self.id, "Cancel found the entry already filled");
                    return Ok(EntryResolution::Committed {
                        quantity: order.quantity,
                    });
                }
                Err(VenueError::Fatal(msg)) => return Err(EngineError::Fatal(msg)),
                Err(VenueError::RateLimited { retry_after }) => {
                    if !budget.consume() {
                        break;
                    }
                    tokio::time::sleep(retry_after).await;
                }
                Err(VenueError::Transient(msg)) => {
                    if !budget.consume() {
                        break;
                    }
                    debug!(cycle_id = self.id, error = %msg, "Entry cancel failed, retrying");
                    tokio::time::sleep(budget.delay()).await;
                }
                Err(VenueError::Client { code, msg }) => {
                    warn!(cycle_id = self.id, code, error = %msg, "Entry cancel rejected");
                    break;
                }
            }
        }

        error!(
            cycle_id = self.id,
            client_order_id = %order.client_order_id,
            "Entry cancel failed, order state unresolved"
        );
        Ok(EntryResolution::Abandoned {
            reason: "entry cancel failed".to_string(),
        })
    }

    /// Cancel the unfilled remainder of a committed partial without
    /// blocking the exit path.
    ///
    /// If the cancel reports the order gone because the rest filled,
    /// the extra quantity is sold at market so nothing stays open.
    fn spawn_residual_cancel(&mut self, order: &Order) {
        let api = Arc::clone(self.api);
        let cycle_id = self.id;
        let symbol = order.symbol.clone();
        let client_order_id = order.client_order_id.clone();
        let seen_executed = order.executed_qty;
        let residual_qty = order.remaining();
        let sell_symbol = self.opportunity.sell_symbol.clone();

        let handle = tokio::spawn(async move {
            match api.cancel_order(symbol, client_order_id).await {
                Ok(canceled) => {
                    let unseen = canceled.executed_qty - seen_executed;
                    if unseen.is_zero() {
                        debug!(cycle_id, "Residual entry canceled");
                    } else {
                        warn!(
                            cycle_id,
                            unseen = %unseen,
                            "Residual cancel caught extra fills, position larger than exited"
                        );
                    }
                    None
                }
                Err(VenueError::AlreadyResolved) => {
                    info!(
                        cycle_id,
                        quantity = %residual_qty,
                        "Residual filled before cancel, selling the extra at market"
                    );
                    let request =
                        OrderRequest::market(sell_symbol, OrderSide::Sell, residual_qty);
                    match api.place_order(request).await {
                        Ok(_) => Some(residual_qty),
                        Err(e) => {
                            error!(cycle_id, error = %e, "Escalated residual sell failed");
                            None
                        }
                    }
                }
                Err(e) => {
                    warn!(cycle_id, error = %e, "Residual cancel failed");
                    None
                }
            }
        });
        self.residual = Some(handle);
    }

    /// Wait out the residual branch so its orders are accounted for
    /// before the cycle is declared over.
    async fn join_residual(&mut self) {
        if let Some(handle) = self.residual.take() {
            match handle.await {
                Ok(Some(sold)) => {
                    info!(cycle_id = self.id, quantity = %sold, "Residual escalation sold at market");
                }
                Ok(None) => {}
                Err(e) => warn!(cycle_id = self.id, error = %e, "Residual task failed"),
            }
        }
    }

    /// Post and monitor the exit leg.
    ///
    /// `market_close` forces a MARKET sell for a position that must
    /// not wait for the planned price.
    async fn run_exit(&mut self, quantity: Size, market_close: bool) -> EngineResult<CycleOutcome> {
        let exit_type = if market_close {
            OrderType::Market
        } else {
            self.config.exit_order_type
        };
        let request = match exit_type {
            OrderType::Limit => OrderRequest::limit(
                self.opportunity.sell_symbol.clone(),
                OrderSide::Sell,
                self.opportunity.sell_price,
                quantity,
            ),
            OrderType::Market => OrderRequest::market(
                self.opportunity.sell_symbol.clone(),
                OrderSide::Sell,
                quantity,
            ),
        };

        let exit = match self.post_with_retry(request.clone()).await? {
            PostOutcome::Placed(order) => order,
            PostOutcome::NotPlaced => {
                if exit_type == OrderType::Market {
                    error!(
                        cycle_id = self.id,
                        quantity = %quantity,
                        "Market close refused, position may remain open"
                    );
                    self.enter(CycleState::Aborted);
                    return Ok(CycleOutcome::Aborted {
                        reason: "unliquidated position".to_string(),
                    });
                }
                warn!(cycle_id = self.id, "Exit post failed, falling back to market");
                return self.market_fallback(quantity).await;
            }
            PostOutcome::Indeterminate => {
                return self.recover_indeterminate_exit(&request, quantity).await;
            }
        };

        self.enter(CycleState::ExitMonitoring);
        self.monitor_exit(exit, quantity, market_close).await
    }

    /// An exit post whose fate is unknown cannot simply be retried at
    /// market: if it did land, a second sell would exceed the entry.
    /// Cancel by id to find out, then close whatever remains.
    async fn recover_indeterminate_exit(
        &mut self,
        request: &OrderRequest,
        quantity: Size,
    ) -> EngineResult<CycleOutcome> {
        match self
            .api
            .cancel_order(request.symbol.clone(), request.client_order_id.clone())
            .await
        {
            Ok(canceled) => {
                let sold = canceled.executed_qty;
                let remainder = quantity - sold;
                warn!(
                    cycle_id = self.id,
                    sold = %sold,
                    remainder = %remainder,
                    "Unconfirmed exit was resting, canceled"
                );
                if remainder.is_zero() {
                    self.enter(CycleState::Resolved);
                    return Ok(CycleOutcome::Captured { quantity });
                }
                self.market_fallback(remainder).await
            }
            Err(e) => {
                error!(
                    cycle_id = self.id,
                    error = %e,
                    "Exit state unresolved, not risking a second sell"
                );
                self.enter(CycleState::Aborted);
                Ok(CycleOutcome::Aborted {
                    reason: "exit state unresolved".to_string(),
                })
            }
        }
    }

    /// Watch the exit order until it fills or polling gives out.
    async fn monitor_exit(
        &mut self,
        mut order: Order,
        quantity: Size,
        market_close: bool,
    ) -> EngineResult<CycleOutcome> {
        let mut polls = RetryBudget::new(
            self.config.exit_poll_attempts,
            self.config.exit_poll_interval(),
        );

        loop {
            if order.is_filled() {
                info!(cycle_id = self.id, quantity = %order.executed_qty, "Exit filled");
                self.enter(CycleState::Resolved);
                if market_close {
                    return Ok(CycleOutcome::Liquidated {
                        quantity: order.executed_qty,
                    });
                }
                return Ok(CycleOutcome::Captured {
                    quantity: order.executed_qty,
                });
            }

            if matches!(
                order.status,
                OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Rejected
            ) {
                // The venue closed it without us; whatever sold stays
                // sold, the rest goes to market.
                let sold = order.executed_qty;
                let remainder = quantity - sold;
                warn!(
                    cycle_id = self.id,
                    status = ?order.status,
                    sold = %sold,
                    remainder = %remainder,
                    "Exit closed by the venue"
                );
                if remainder.is_zero() {
                    self.enter(CycleState::Resolved);
                    if market_close {
                        return Ok(CycleOutcome::Liquidated { quantity: sold });
                    }
                    return Ok(CycleOutcome::Captured { quantity: sold });
                }
                return self.market_fallback(remainder).await;
            }

            if !polls.consume() {
                return self.cancel_exit(order, quantity).await;
            }
            tokio::time::sleep(polls.delay()).await;

            match self
                .api
                .get_order_status(order.symbol.clone(), order.client_order_id.clone())
                .await
            {
                Ok(fresh) => order = fresh,
                Err(VenueError::Fatal(msg)) => return Err(EngineError::Fatal(msg)),
                Err(VenueError::RateLimited { retry_after }) => {
                    warn!(cycle_id = self.id, "Rate limited while polling exit");
                    tokio::time::sleep(retry_after).await;
                }
                Err(e) => {
                    debug!(cycle_id = self.id, error = %e, "Exit poll failed");
                }
            }
        }
    }

    /// Pull an exit that would not fill and close the remainder at
    /// market.
    async fn cancel_exit(&mut self, order: Order, quantity: Size) -> EngineResult<CycleOutcome> {
        warn!(
            cycle_id = self.id,
            client_order_id = %order.client_order_id,
            "Exit unfilled after polling, canceling for a market close"
        );
        let mut budget = RetryBudget::new(self.config.retry_attempts, self.config.retry_delay());

        loop {
            match self
                .api
                .cancel_order(order.symbol.clone(), order.client_order_id.clone())
                .await
            {
                Ok(canceled) => {
                    let sold = canceled.executed_qty;
                    let remainder = quantity - sold;
                    if remainder.is_zero() {
                        info!(cycle_id = self.id, "Exit had fully filled by cancel time");
                        self.enter(CycleState::Resolved);
                        return Ok(CycleOutcome::Captured { quantity: sold });
                    }
                    info!(
                        cycle_id = self.id,
                        sold = %sold,
                        remainder = %remainder,
                        "Selling the exit remainder at market"
                    );
                    return self.market_fallback(remainder).await;
                }
                Err(VenueError::AlreadyResolved) => {
                    info!(cycle_id = self.id, "Cancel found the exit already filled");
                    self.enter(CycleState::Resolved);
                    return Ok(CycleOutcome::Captured { quantity });
                }
                Err(VenueError::Fatal(msg)) => return Err(EngineError::Fatal(msg)),
                Err(VenueError::RateLimited { retry_after }) => {
                    if !budget.consume() {
                        break;
                    }
                    tokio::time::sleep(retry_after).await;
                }
                Err(VenueError::Transient(msg)) => {
                    if !budget.consume() {
                        break;
                    }
                    debug!(cycle_id = self.id, error = %msg, "Exit cancel failed, retrying");
                    tokio::time::sleep(budget.delay()).await;
                }
                Err(VenueError::Client { code, msg }) => {
                    warn!(cycle_id = self.id, code, error = %msg, "Exit cancel rejected");
                    break;
                }
            }
        }

        // The resting exit may still fill; selling at market on top of
        // it could exceed what was bought. Leave it and flag the cycle.
        error!(
            cycle_id = self.id,
            client_order_id = %order.client_order_id,
            "Exit cancel failed, leaving the resting order"
        );
        self.enter(CycleState::Aborted);
        Ok(CycleOutcome::Aborted {
            reason: "exit cancel failed, order left resting".to_string(),
        })
    }

    /// Market sell to guarantee the position closes.
    async fn market_fallback(&mut self, quantity: Size) -> EngineResult<CycleOutcome> {
        let request = OrderRequest::market(
            self.opportunity.sell_symbol.clone(),
            OrderSide::Sell,
            quantity,
        );

        match self.post_with_retry(request).await? {
            PostOutcome::Placed(order) => {
                if !order.is_filled() {
                    warn!(
                        cycle_id = self.id,
                        status = ?order.status,
                        executed = %order.executed_qty,
                        "Market close not reported filled"
                    );
                }
                info!(cycle_id = self.id, quantity = %quantity, "Position closed at market");
                self.enter(CycleState::Resolved);
                Ok(CycleOutcome::Liquidated { quantity })
            }
            PostOutcome::NotPlaced | PostOutcome::Indeterminate => {
                error!(
                    cycle_id = self.id,
                    quantity = %quantity,
                    "Market fallback failed, position may remain open"
                );
                self.enter(CycleState::Aborted);
                Ok(CycleOutcome::Aborted {
                    reason: "unliquidated position".to_string(),
                })
            }
        }
    }
}
