//! # Charge Types
//!
//! Domain types and port traits for the payment charge adapter.
//! No IO - only data structures, conversion rules, and trait definitions.
//!
//! ## Architecture
//!
//! - `domain/` - Money conversion, card mapping, ledger wire models, token claims
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for the API boundary
//! - `error/` - Pipeline and caller-facing error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

pub use domain::{
    AccountMapper, BalanceResponse, CardInfo, DerivedAccounts, LedgerReceipt, LedgerTransaction,
    MinorUnits, Money, RemoteErrorBody, ServiceClaims, format_money, mask_card_number,
    to_minor_units, validate_card_number,
};
pub use dto::*;
pub use error::{
    AuthError, CardError, ChargeError, FailureCategory, LedgerError, LedgerErrorKind, MoneyError,
};
pub use ports::{CredentialIssuer, Ledger};
