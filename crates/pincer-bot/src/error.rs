//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Preflight error: {0}")]
    Preflight(String),

    #[error("Engine error: {0}")]
    Engine(#[from] pincer_engine::EngineError),
}

pub type AppResult<T> = Result<T, AppError>;
