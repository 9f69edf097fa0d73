//! Port traits (interfaces for adapters).
//!
//! The application layer depends on these traits, not concrete implementations.

mod credentials;
mod ledger;

pub use credentials::CredentialIssuer;
pub use ledger::Ledger;
