//! Ledger port trait.

use crate::domain::{LedgerReceipt, LedgerTransaction};
use crate::error::LedgerError;

/// The remote system of record for charges.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync + 'static {
    /// Submits a transfer. Errors arrive already classified.
    async fn create_transaction(&self, tx: &LedgerTransaction)
    -> Result<LedgerReceipt, LedgerError>;

    /// Lightweight readiness probe.
    async fn health_check(&self) -> Result<(), LedgerError>;
}
