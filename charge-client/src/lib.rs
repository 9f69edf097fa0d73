//! # Charge Client SDK
//!
//! A typed Rust client for the payment charge API.

use charge_types::{
    CardInfo, ChargeRequest, ChargeResponse, ErrorResponse, Money, ReadinessResponse,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {reason} - {message}")]
    Api {
        status: u16,
        /// Machine-readable reason such as `INVALID_ARGUMENT`; empty when the
        /// server did not send a structured error
        reason: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Charge API client.
pub struct ChargeClient {
    base_url: String,
    http: Client,
}

impl ChargeClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks if the service process is alive.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Fetches the readiness report. A not-ready service still returns its report.
    pub async fn ready(&self) -> Result<ReadinessResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/readyz", self.base_url))
            .send()
            .await?;

        if resp.status() == StatusCode::SERVICE_UNAVAILABLE {
            let body = resp.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }
        self.handle_response(resp).await
    }

    /// Charges `card` for `amount`.
    pub async fn charge(
        &self,
        amount: Money,
        card: CardInfo,
    ) -> Result<ChargeResponse, ClientError> {
        self.submit(&ChargeRequest::new(amount, card)).await
    }

    /// Sends a prebuilt charge request as-is.
    pub async fn submit(&self, req: &ChargeRequest) -> Result<ChargeResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/api/charge", self.base_url))
            .json(req)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(api_error(status, body))
        }
    }
}

fn api_error(status: StatusCode, body: String) -> ClientError {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => ClientError::Api {
            status: status.as_u16(),
            reason: err.reason,
            message: err.error,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            reason: String::new(),
            message: body,
        },
    }
}
