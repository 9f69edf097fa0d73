//! Card validation and card-to-account mapping.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CardError;

/// Merchant account used when none is configured.
pub const DEFAULT_MERCHANT_ACCOUNT: &str = "1111111111";

/// Routing number used when none is configured.
pub const DEFAULT_ROUTING_NUMBER: &str = "123456789";

const ACCOUNT_NUMBER_LEN: usize = 10;
const MIN_CARD_LEN: usize = 13;
const MAX_CARD_LEN: usize = 19;

/// Card details as submitted by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardInfo {
    /// Card number, spaces and dashes allowed
    #[schema(example = "4532-0151-1283-0366")]
    pub credit_card_number: String,
    #[serde(default)]
    pub credit_card_cvv: Option<i32>,
    #[serde(default)]
    pub credit_card_expiration_year: Option<i32>,
    #[serde(default)]
    pub credit_card_expiration_month: Option<i32>,
}

impl CardInfo {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            credit_card_number: number.into(),
            credit_card_cvv: None,
            credit_card_expiration_year: None,
            credit_card_expiration_month: None,
        }
    }
}

/// Payer and payee coordinates for one charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccounts {
    pub payer_account: String,
    pub payer_routing: String,
    pub payee_account: String,
    pub payee_routing: String,
}

/// Strips spaces and dashes from a card number.
fn clean(card_number: &str) -> String {
    card_number
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Checks that a card number is 13-19 decimal digits once spaces and dashes
/// are removed. No Luhn or BIN checks.
pub fn validate_card_number(card_number: &str) -> Result<(), CardError> {
    let cleaned = clean(card_number);
    let len = cleaned.chars().count();

    if !(MIN_CARD_LEN..=MAX_CARD_LEN).contains(&len) {
        return Err(CardError::InvalidLength(len));
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::NonDigit);
    }
    Ok(())
}

/// Last four digits for logs, e.g. `****0366`.
pub fn mask_card_number(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return "****".to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("****{last_four}")
}

/// Deterministic placeholder mapping from card numbers to ledger accounts.
///
/// The payer account is the last ten characters of the cleaned card number;
/// every account shares the configured routing number. Replace with a real
/// lookup without touching the charge pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMapper {
    merchant_account: String,
    routing_number: String,
}

impl Default for AccountMapper {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl AccountMapper {
    /// Creates a mapper; empty values fall back to the defaults.
    pub fn new(merchant_account: impl Into<String>, routing_number: impl Into<String>) -> Self {
        let merchant_account = merchant_account.into();
        let routing_number = routing_number.into();

        Self {
            merchant_account: if merchant_account.is_empty() {
                DEFAULT_MERCHANT_ACCOUNT.to_string()
            } else {
                merchant_account
            },
            routing_number: if routing_number.is_empty() {
                DEFAULT_ROUTING_NUMBER.to_string()
            } else {
                routing_number
            },
        }
    }

    /// Maps a card number to `(account, routing)`.
    ///
    /// Fewer than ten characters after cleaning yields the merchant account.
    /// That is a documented degenerate case, not an error.
    pub fn card_to_account(&self, card_number: &str) -> (String, String) {
        let cleaned: Vec<char> = clean(card_number).chars().collect();

        if cleaned.len() < ACCOUNT_NUMBER_LEN {
            return (self.merchant_account.clone(), self.routing_number.clone());
        }

        let account: String = cleaned[cleaned.len() - ACCOUNT_NUMBER_LEN..].iter().collect();
        (account, self.routing_number.clone())
    }

    /// The account that receives every charge.
    pub fn merchant_account(&self) -> (String, String) {
        (self.merchant_account.clone(), self.routing_number.clone())
    }

    /// Derives both sides of a charge from a card number.
    pub fn derive_accounts(&self, card_number: &str) -> DerivedAccounts {
        let (payer_account, payer_routing) = self.card_to_account(card_number);
        let (payee_account, payee_routing) = self.merchant_account();

        DerivedAccounts {
            payer_account,
            payer_routing,
            payee_account,
            payee_routing,
        }
    }
}
