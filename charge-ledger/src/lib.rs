//! # Charge Ledger
//!
//! Outbound adapters for the payment charge adapter:
//! - `auth` - RS256-signed service tokens presented to the ledger
//! - `client` - HTTP client that implements the `Ledger` port

pub mod auth;
pub mod client;

pub use auth::{GeneratedKeyPair, ServiceAuthenticator};
pub use client::{DEFAULT_TIMEOUT, LedgerClient};
