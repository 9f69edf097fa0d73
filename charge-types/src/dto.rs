//! Data Transfer Objects for the charge API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CardInfo, Money};

/// Request to charge a card.
///
/// Both fields are optional on the wire so that a missing field surfaces as
/// an `INVALID_ARGUMENT` failure rather than a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChargeRequest {
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub credit_card: Option<CardInfo>,
}

impl ChargeRequest {
    pub fn new(amount: Money, card: CardInfo) -> Self {
        Self {
            amount: Some(amount),
            credit_card: Some(card),
        }
    }
}

/// Response after a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChargeResponse {
    /// Ledger idempotency key, or a `SIM-` id when running without a ledger
    #[schema(example = "3f2b8c1e-6a1d-4c2e-9b7a-0d5e8f9a1c23")]
    pub transaction_id: String,
}

/// Error body returned by the charge API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// HTTP status code
    #[schema(example = 400)]
    pub code: u16,
    /// Machine-readable reason
    #[schema(example = "INVALID_ARGUMENT")]
    pub reason: String,
}

/// Readiness report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    #[schema(example = "ready")]
    pub status: String,
    /// `available`, `unavailable` or `simulated`
    #[schema(example = "available")]
    pub ledger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
