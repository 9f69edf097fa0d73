//! Ledger wire models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::DerivedAccounts;
use super::money::MinorUnits;

/// A transfer submitted to the ledger.
///
/// `uuid` doubles as the ledger's idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub from_account_num: String,
    pub from_routing_num: String,
    pub to_account_num: String,
    pub to_routing_num: String,
    pub amount: MinorUnits,
    pub uuid: String,
}

impl LedgerTransaction {
    pub fn new(accounts: &DerivedAccounts, amount: MinorUnits, uuid: impl Into<String>) -> Self {
        Self {
            from_account_num: accounts.payer_account.clone(),
            from_routing_num: accounts.payer_routing.clone(),
            to_account_num: accounts.payee_account.clone(),
            to_routing_num: accounts.payee_routing.clone(),
            amount,
            uuid: uuid.into(),
        }
    }
}

/// Ledger confirmation of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    /// Ledger-assigned id; absent when the receipt was synthesized locally.
    #[serde(default)]
    pub transaction_id: Option<i64>,
    #[serde(default)]
    pub from_account_num: String,
    #[serde(default)]
    pub from_routing_num: String,
    #[serde(default)]
    pub to_account_num: String,
    #[serde(default)]
    pub to_routing_num: String,
    #[serde(default)]
    pub amount: MinorUnits,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LedgerReceipt {
    /// Receipt built from the request when the ledger answers 201 without a body.
    pub fn from_request(tx: &LedgerTransaction) -> Self {
        Self {
            transaction_id: None,
            from_account_num: tx.from_account_num.clone(),
            from_routing_num: tx.from_routing_num.clone(),
            to_account_num: tx.to_account_num.clone(),
            to_routing_num: tx.to_routing_num.clone(),
            amount: tx.amount,
            timestamp: Utc::now(),
        }
    }
}

/// Account balance as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_num: String,
    #[serde(default)]
    pub routing_num: String,
    pub balance: MinorUnits,
}

/// Structured error body returned by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}
