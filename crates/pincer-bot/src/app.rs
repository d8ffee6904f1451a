//! Main application orchestration.
//!
//! Wires the stream connection, quote cache, detector, and lifecycle
//! engine together: ticks update the cache and are checked for
//! opportunities; in trade mode an opportunity spawns one cycle under
//! the global execution lock; ticks arriving while that cycle runs are
//! counted and ignored.

use crate::config::{AppConfig, Credentials, OperatingMode};
use crate::error::{AppError, AppResult};
use pincer_detector::Detector;
use pincer_engine::{
    CycleOutcome, DynOrderApi, EngineError, EngineResult, ExecutionLock, LifecycleEngine,
    LiveOrderApi,
};
use pincer_feed::{QuoteCache, TickParser};
use pincer_telemetry::SessionStats;
use pincer_venue::{MetaClient, VenueClient};
use pincer_ws::{ConnectionConfig, ConnectionManager, StreamEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Periodic session summary interval.
const STATS_INTERVAL: Duration = Duration::from_secs(3600);

/// How long shutdown waits for an in-flight cycle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(120);

/// Main application.
pub struct Application {
    config: AppConfig,
    quote_cache: Arc<QuoteCache>,
    stats: Arc<SessionStats>,
    lock: Arc<ExecutionLock>,
    // Built in run_preflight once symbol rules are known.
    detector: Option<Detector>,
    // Built in run_preflight, trade mode only.
    engine: Option<Arc<LifecycleEngine>>,
}

impl Application {
    /// Create a new application.
    ///
    /// Call `run_preflight()` before `run()`; it validates the config
    /// and fetches the symbol rules the detector sizes orders with.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            quote_cache: Arc::new(QuoteCache::new()),
            stats: Arc::new(SessionStats::new()),
            lock: Arc::new(ExecutionLock::new()),
            detector: None,
            engine: None,
        }
    }

    /// Validate configuration and fetch per-symbol trading rules.
    ///
    /// In trade mode this also reads the API credentials from the
    /// environment and arms the execution engine, so a bad key fails
    /// here instead of on the first live order.
    pub async fn run_preflight(&mut self) -> AppResult<()> {
        self.config.validate()?;

        let symbols = self.config.strategy.symbols();
        info!(
            base_url = %self.config.venue.base_url,
            symbols = ?symbols,
            "Running preflight validation"
        );

        let meta = MetaClient::new(&self.config.venue.base_url)
            .map_err(|e| AppError::Preflight(format!("Failed to create meta client: {e}")))?;
        let rules = meta
            .fetch_symbol_rules(&symbols)
            .await
            .map_err(|e| AppError::Preflight(format!("Failed to fetch symbol rules: {e}")))?;

        self.detector = Some(Detector::new(self.config.strategy.clone(), rules));

        if self.config.mode == OperatingMode::Trade {
            let credentials = Credentials::from_env()?;
            let client = VenueClient::new(
                self.config.venue.base_url.clone(),
                credentials.api_key,
                credentials.api_secret,
                self.config.venue.recv_window_ms,
            )
            .map_err(|e| AppError::Preflight(format!("Failed to create venue client: {e}")))?;

            let api: DynOrderApi = Arc::new(LiveOrderApi::new(client));
            self.engine = Some(Arc::new(LifecycleEngine::new(
                api,
                self.config.engine.clone(),
            )));
            info!("Execution engine armed");
        }

        info!("Preflight complete");
        Ok(())
    }

    /// Run the application until shutdown or a fatal venue error.
    pub async fn run(mut self) -> AppResult<()> {
        let detector = self.detector.take().ok_or_else(|| {
            AppError::Preflight("Symbol rules not loaded. Call run_preflight() first.".to_string())
        })?;

        info!(mode = ?self.config.mode, "Starting application");

        let (event_tx, mut event_rx) = mpsc::channel::<StreamEvent>(1024);
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<EngineResult<CycleOutcome>>(8);

        let mut ws_config: ConnectionConfig = self.config.websocket.clone().into();
        ws_config.url = self.config.ws_url.clone();
        ws_config.streams = self.config.strategy.stream_names();

        info!(streams = ?ws_config.streams, "Configured stream subscriptions");

        let connection = Arc::new(ConnectionManager::new(ws_config, event_tx));
        let connection_task = Arc::clone(&connection);
        let ws_handle = tokio::spawn(async move {
            if let Err(e) = connection_task.connect().await {
                error!(error = %e, "Stream connection failed");
            }
        });

        let parser = TickParser::new();
        let mut stats_interval = tokio::time::interval(STATS_INTERVAL);
        let mut fatal: Option<EngineError> = None;

        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    self.handle_event(&parser, &detector, event, &outcome_tx);
                }

                Some(result) = outcome_rx.recv() => {
                    if let Some(e) = self.record_outcome(result) {
                        fatal = Some(e);
                        break;
                    }
                }

                _ = stats_interval.tick() => {
                    self.stats.log_summary();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        connection.shutdown();

        // A cycle spawned from this loop may still be working its
        // order off the book; give it a bounded window to finish.
        if fatal.is_none() && self.lock.is_active() {
            info!("Waiting for the in-flight cycle to finish");
            match tokio::time::timeout(SHUTDOWN_GRACE, outcome_rx.recv()).await {
                Ok(Some(result)) => {
                    if let Some(e) = self.record_outcome(result) {
                        fatal = Some(e);
                    }
                }
                Ok(None) => {}
                Err(_) => warn!("Cycle still running at the shutdown deadline"),
            }
        }

        info!(
            cycles_started = self.stats.cycles_started(),
            "Shutting down"
        );
        self.stats.log_summary();
        ws_handle.abort();

        match fatal {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Apply one stream event and check for an opportunity.
    ///
    /// Ticks that arrive while a cycle holds the execution lock are
    /// counted and discarded; the cycle trades the prices it was
    /// detected on.
    fn handle_event(
        &self,
        parser: &TickParser,
        detector: &Detector,
        event: StreamEvent,
        outcome_tx: &mpsc::Sender<EngineResult<CycleOutcome>>,
    ) {
        let quote = match parser.parse(&event.stream, &event.data) {
            Ok(Some(quote)) => quote,
            Ok(None) => return,
            Err(e) => {
                warn!(stream = %event.stream, error = %e, "Dropping malformed tick");
                return;
            }
        };

        self.stats.record_tick();

        if self.lock.is_active() {
            self.stats.record_tick_dropped();
            return;
        }

        self.quote_cache.update(quote);

        let Some(opportunity) = detector.check(&self.quote_cache) else {
            return;
        };
        self.stats.record_opportunity();

        if self.config.is_observe_mode() {
            debug!("Observe mode, not trading");
            return;
        }

        let Some(guard) = self.lock.try_acquire() else {
            debug!("Execution lock busy, dropping opportunity");
            return;
        };
        let Some(engine) = &self.engine else {
            // Trade mode arms the engine in preflight; a missing one
            // means preflight was skipped.
            error!("No execution engine, dropping opportunity");
            return;
        };

        self.stats.record_cycle_started();
        let engine = Arc::clone(engine);
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let result = engine.run_cycle(opportunity, guard).await;
            if tx.send(result).await.is_err() {
                warn!("Outcome receiver dropped");
            }
        });
    }

    /// Account for a finished cycle. Returns the error when it was
    /// fatal and trading must stop.
    fn record_outcome(&self, result: EngineResult<CycleOutcome>) -> Option<EngineError> {
        match result {
            Ok(CycleOutcome::Captured { quantity }) => {
                self.stats.record_cycle_captured();
                info!(quantity = %quantity, "Cycle captured its spread");
                None
            }
            Ok(CycleOutcome::Liquidated { quantity }) => {
                self.stats.record_cycle_liquidated();
                info!(quantity = %quantity, "Cycle closed at market");
                None
            }
            Ok(CycleOutcome::NoFill) => {
                self.stats.record_cycle_no_fill();
                info!("Cycle ended with no fill");
                None
            }
            Ok(CycleOutcome::Aborted { reason }) => {
                self.stats.record_cycle_aborted();
                warn!(reason = %reason, "Cycle aborted");
                None
            }
            Err(e) => {
                self.stats.record_cycle_aborted();
                error!(error = %e, "Trading halted on fatal venue error");
                Some(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pincer_core::{RuleBook, SymbolRules};
    use serde_json::json;

    fn observe_app() -> Application {
        Application::new(AppConfig::default())
    }

    fn detector_for(app: &Application) -> Detector {
        let mut rules = RuleBook::new();
        for symbol in app.config.strategy.symbols() {
            rules.insert(symbol, SymbolRules::default());
        }
        Detector::new(app.config.strategy.clone(), rules)
    }

    fn book_ticker_event(symbol: &str) -> StreamEvent {
        StreamEvent {
            stream: format!("{}@bookTicker", symbol.to_lowercase()),
            data: json!({
                "u": 1,
                "s": symbol,
                "b": "99.90",
                "B": "5.0",
                "a": "100.00",
                "A": "3.5"
            }),
        }
    }

    #[tokio::test]
    async fn test_run_requires_preflight() {
        let app = observe_app();
        let result = app.run().await;
        assert!(matches!(result, Err(AppError::Preflight(_))));
    }

    #[tokio::test]
    async fn test_tick_ignored_while_cycle_active() {
        let app = observe_app();
        let detector = detector_for(&app);
        let parser = TickParser::new();
        let (tx, _rx) = mpsc::channel(8);

        let _guard = app.lock.try_acquire().unwrap();
        app.handle_event(&parser, &detector, book_ticker_event("BTCUSD"), &tx);

        assert_eq!(app.stats.ticks_seen(), 1);
        assert!(app.quote_cache.is_empty());
    }

    #[tokio::test]
    async fn test_tick_applied_when_idle() {
        let app = observe_app();
        let detector = detector_for(&app);
        let parser = TickParser::new();
        let (tx, _rx) = mpsc::channel(8);

        app.handle_event(&parser, &detector, book_ticker_event("BTCUSD"), &tx);

        assert_eq!(app.stats.ticks_seen(), 1);
        assert_eq!(app.quote_cache.len(), 1);
        assert!(!app.lock.is_active());
    }

    #[tokio::test]
    async fn test_malformed_tick_dropped() {
        let app = observe_app();
        let detector = detector_for(&app);
        let parser = TickParser::new();
        let (tx, _rx) = mpsc::channel(8);

        let event = StreamEvent {
            stream: "btcusd@bookTicker".to_string(),
            data: json!({"s": "BTCUSD"}),
        };
        app.handle_event(&parser, &detector, event, &tx);

        assert_eq!(app.stats.ticks_seen(), 0);
        assert!(app.quote_cache.is_empty());
    }
}
