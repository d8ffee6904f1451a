//! Venue error types and response classification.
//!
//! Every REST failure is folded into one of five classes, and all
//! retry decisions downstream dispatch on the class alone.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Wait applied when the venue rate-limits without a Retry-After header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Venue code for a cancel whose target order is not open.
const CODE_UNKNOWN_ORDER: i64 = -2011;
/// Venue code for a status query on an order the venue cannot find.
const CODE_NO_SUCH_ORDER: i64 = -2013;
/// Venue code for a request timestamp outside the receive window.
const CODE_TIMESTAMP_OUT_OF_WINDOW: i64 = -1021;

#[derive(Debug, Error)]
pub enum VenueError {
    /// Unrecoverable. Trading must stop rather than continue blind.
    #[error("Fatal venue error: {0}")]
    Fatal(String),

    /// The venue asked us to back off.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Worth retrying within the attempt budget.
    #[error("Transient venue error: {0}")]
    Transient(String),

    /// The target order already reached a terminal state.
    #[error("Order already resolved on the venue")]
    AlreadyResolved,

    /// The venue rejected the request as malformed or unsatisfiable.
    #[error("Venue rejected request: code={code} msg={msg}")]
    Client { code: i64, msg: String },
}

pub type VenueResult<T> = Result<T, VenueError>;

/// Error body the venue attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    msg: String,
}

/// Classify a non-success REST response.
///
/// `retry_after` is the parsed Retry-After header, if the response
/// carried one.
pub fn classify_response(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> VenueError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return VenueError::RateLimited {
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
        };
    }

    // 418 means the IP has been auto-banned for ignoring 429s.
    if status == StatusCode::IM_A_TEAPOT {
        return VenueError::Fatal(format!("IP banned by venue: {body}"));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return VenueError::Fatal(format!("Authentication rejected: HTTP {status}: {body}"));
    }

    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return VenueError::Transient(format!("HTTP {status}: {body}"));
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if err.code == CODE_UNKNOWN_ORDER || err.code == CODE_NO_SUCH_ORDER => {
            VenueError::AlreadyResolved
        }
        Ok(err) if err.code == CODE_TIMESTAMP_OUT_OF_WINDOW => VenueError::Transient(err.msg),
        Ok(err) => VenueError::Client {
            code: err.code,
            msg: err.msg,
        },
        Err(_) => VenueError::Client {
            code: 0,
            msg: format!("HTTP {status}: {body}"),
        },
    }
}

/// Classify a transport-level failure from the HTTP client.
///
/// Everything at this layer is a retryable network condition; the
/// auth-class failures that warrant `Fatal` arrive as HTTP statuses
/// and go through [`classify_response`] instead.
pub fn classify_transport(err: reqwest::Error) -> VenueError {
    VenueError::Transient(err.to_string())
}
