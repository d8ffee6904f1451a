//! Venue REST access for pincer.
//!
//! Request signing, the order endpoints, response-to-error-class
//! mapping, and exchange metadata for symbol rules.

pub mod client;
pub mod error;
pub mod meta;
pub mod sign;

pub use client::{OrderRequest, VenueClient};
pub use error::{classify_response, classify_transport, VenueError, VenueResult};
pub use meta::MetaClient;
pub use sign::{sign_query, signed_query, QueryString};
