//! Engine error type.

use thiserror::Error;

/// Errors that escape a cycle.
///
/// Everything recoverable is absorbed inside the cycle itself; an
/// error surfacing here means trading must stop.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Credentials rejected, IP banned, or another venue response
    /// that retrying cannot fix.
    #[error("Fatal venue error: {0}")]
    Fatal(String),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
