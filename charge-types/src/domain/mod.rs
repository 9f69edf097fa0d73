//! Domain models for the charge pipeline.

pub mod card;
pub mod ledger;
pub mod money;
pub mod token;

pub use card::{AccountMapper, CardInfo, DerivedAccounts, mask_card_number, validate_card_number};
pub use ledger::{BalanceResponse, LedgerReceipt, LedgerTransaction, RemoteErrorBody};
pub use money::{MinorUnits, Money, format_money, to_minor_units};
pub use token::ServiceClaims;
