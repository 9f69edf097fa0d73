//! Service-to-service token claims.

use serde::{Deserialize, Serialize};

/// Subject every token is issued for.
pub const SERVICE_USER: &str = "payment-service";

/// Display name embedded in every token.
pub const SERVICE_NAME: &str = "Payment Integration Service";

/// Claims carried by a ledger service token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    /// Always [`SERVICE_USER`]
    pub user: String,
    /// Payer account the token is scoped to
    pub acct: String,
    pub name: String,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expires at (Unix seconds)
    pub exp: u64,
}

impl ServiceClaims {
    pub fn new(payer_account: &str, issued_at: u64, ttl_secs: u64) -> Self {
        Self {
            user: SERVICE_USER.to_string(),
            acct: payer_account.to_string(),
            name: SERVICE_NAME.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.exp
    }
}
