//! Opportunity detection for pincer.
//!
//! Consumes the live quote cache and produces sized, venue-conformant
//! opportunities for the execution engine.

pub mod config;
pub mod detector;
pub mod opportunity;

pub use config::{StrategyConfig, StrategyKind};
pub use detector::{Detector, DetectorStats};
pub use opportunity::Opportunity;
