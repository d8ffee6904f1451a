//! Order lifecycle engine for pincer.
//!
//! Turns a detected opportunity into a supervised entry/exit cycle:
//! a global execution lock admits one cycle at a time, and the cycle
//! walks a bounded state machine that always ends with the position
//! either captured, liquidated, or explicitly abandoned.

pub mod config;
pub mod cycle;
pub mod error;
pub mod lock;
pub mod retry;
pub mod venue_api;

pub use config::EngineConfig;
pub use cycle::{CycleOutcome, CycleState, LifecycleEngine};
pub use error::{EngineError, EngineResult};
pub use lock::{CycleGuard, ExecutionLock};
pub use retry::RetryBudget;
pub use venue_api::{BoxFuture, DynOrderApi, LiveOrderApi, MockOrderApi, OrderApi};
