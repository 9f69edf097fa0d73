//! HTTP client for the remote ledger.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, instrument, warn};

use charge_types::{
    BalanceResponse, CredentialIssuer, Ledger, LedgerError, LedgerReceipt, LedgerTransaction,
    RemoteErrorBody,
};

/// Default timeout for every ledger call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ledger API client.
///
/// Every call carries a freshly minted service token scoped to the account
/// being debited or queried.
pub struct LedgerClient {
    base_url: String,
    http: Client,
    credentials: Arc<dyn CredentialIssuer>,
    available: AtomicBool,
}

impl LedgerClient {
    /// Creates a client with the default 30 second timeout.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialIssuer>,
    ) -> Result<Self, LedgerError> {
        Self::with_timeout(base_url, credentials, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialIssuer>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            credentials,
            available: AtomicBool::new(true),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Result of the most recent health probe. Advisory only.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Looks up the balance of `account_num`.
    #[instrument(skip(self))]
    pub async fn check_balance(&self, account_num: &str) -> Result<BalanceResponse, LedgerError> {
        let token = self.credentials.issue_credential(account_num)?;

        let resp = self
            .http
            .get(format!("{}/balances/{}", self.base_url, account_num))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = read_body(resp).await?;

        if status != StatusCode::OK {
            return Err(classify_failure(status, &body, "balance_check_failed"));
        }

        serde_json::from_str(&body).map_err(|e| LedgerError::MalformedResponse {
            status: status.as_u16(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    #[instrument(
        skip(self, tx),
        fields(from = %tx.from_account_num, to = %tx.to_account_num, amount = tx.amount, uuid = %tx.uuid)
    )]
    async fn create_transaction(
        &self,
        tx: &LedgerTransaction,
    ) -> Result<LedgerReceipt, LedgerError> {
        let token = self.credentials.issue_credential(&tx.from_account_num)?;

        debug!("Submitting ledger transaction");
        let resp = self
            .http
            .post(format!("{}/transactions", self.base_url))
            .bearer_auth(token)
            .json(tx)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = read_body(resp).await?;

        if !status.is_success() {
            return Err(classify_failure(status, &body, "transaction_failed"));
        }

        match serde_json::from_str::<LedgerReceipt>(&body) {
            Ok(receipt) => {
                info!(transaction_id = ?receipt.transaction_id, "Ledger transaction created");
                Ok(receipt)
            }
            Err(_) if status == StatusCode::CREATED => {
                debug!("Ledger returned 201 without a receipt body");
                Ok(LedgerReceipt::from_request(tx))
            }
            Err(e) => Err(LedgerError::MalformedResponse {
                status: status.as_u16(),
                message: e.to_string(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), LedgerError> {
        let result = self.probe_ready().await;

        match &result {
            Ok(()) => {
                if !self.available.swap(true, Ordering::Relaxed) {
                    info!("Ledger is reachable again");
                }
            }
            Err(e) => {
                self.available.store(false, Ordering::Relaxed);
                warn!(error = %e, "Ledger health check failed");
            }
        }

        result
    }
}

impl LedgerClient {
    async fn probe_ready(&self) -> Result<(), LedgerError> {
        let resp = self
            .http
            .get(format!("{}/ready", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = read_body(resp).await?;
            return Err(classify_failure(status, &body, "not_ready"));
        }
        Ok(())
    }
}

async fn read_body(resp: Response) -> Result<String, LedgerError> {
    let status = resp.status().as_u16();
    resp.text().await.map_err(|e| {
        if e.is_timeout() {
            transport_error(e)
        } else {
            LedgerError::MalformedResponse {
                status,
                message: format!("failed to read response body: {e}"),
            }
        }
    })
}

fn transport_error(err: reqwest::Error) -> LedgerError {
    if err.is_builder() {
        return LedgerError::Request(err.to_string());
    }
    LedgerError::Unreachable {
        timed_out: err.is_timeout(),
        message: err.to_string(),
    }
}

/// Builds the error for a non-success response. A structured body with a
/// non-empty `error` supplies the code; otherwise the raw body becomes the
/// message under `fallback_code`.
fn classify_failure(status: StatusCode, body: &str, fallback_code: &str) -> LedgerError {
    match serde_json::from_str::<RemoteErrorBody>(body) {
        Ok(parsed) if !parsed.error.is_empty() => {
            LedgerError::remote(status.as_u16(), parsed.error, parsed.message)
        }
        _ => LedgerError::remote(status.as_u16(), fallback_code, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charge_types::LedgerErrorKind;

    #[test]
    fn test_structured_error_body() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error":"insufficient_funds","message":"balance too low","code":400}"#,
            "transaction_failed",
        );
        assert!(err.is_insufficient_funds());
        assert_eq!(err.kind(), LedgerErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_unstructured_error_body() {
        let err = classify_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "upstream exploded",
            "transaction_failed",
        );
        match err {
            LedgerError::Remote {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 500);
                assert_eq!(code, "transaction_failed");
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_error_field_falls_back() {
        let err = classify_failure(
            StatusCode::CONFLICT,
            r#"{"error":"","message":"dup"}"#,
            "transaction_failed",
        );
        assert!(err.is_duplicate());
        assert!(matches!(err, LedgerError::Remote { ref code, .. } if code == "transaction_failed"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        struct NoCredentials;
        impl CredentialIssuer for NoCredentials {
            fn issue_credential(&self, _: &str) -> Result<String, charge_types::AuthError> {
                Ok("token".into())
            }
        }

        let client = LedgerClient::new("http://ledger:8080/", Arc::new(NoCredentials)).unwrap();
        assert_eq!(client.base_url(), "http://ledger:8080");
        assert!(client.is_available());
    }
}
