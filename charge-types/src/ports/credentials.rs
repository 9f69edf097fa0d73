//! Credential issuer port.

use crate::error::AuthError;

/// Mints bearer credentials scoped to a payer account.
///
/// Implementations must be safe to call concurrently.
pub trait CredentialIssuer: Send + Sync {
    fn issue_credential(&self, payer_account: &str) -> Result<String, AuthError>;
}
