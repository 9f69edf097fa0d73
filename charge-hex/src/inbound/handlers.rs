//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;

use charge_types::{ChargeError, ChargeRequest, ErrorResponse, Ledger, ReadinessResponse};

use crate::ChargeService;
use crate::openapi::ApiDoc;
use crate::service::LedgerStatus;

/// Application state shared across handlers.
pub struct AppState<L: Ledger> {
    pub service: ChargeService<L>,
}

/// Wrapper to implement IntoResponse for ChargeError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub ChargeError);

impl From<ChargeError> for ApiError {
    fn from(err: ChargeError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ChargeError::InvalidInput(_) | ChargeError::FailedPrecondition(_) => {
                StatusCode::BAD_REQUEST
            }
            ChargeError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ChargeError::AlreadyExists(_) => StatusCode::CONFLICT,
            ChargeError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
            ChargeError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChargeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: status.as_u16(),
            reason: self.0.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Readiness probe. Simulated mode counts as ready.
pub async fn ready<L: Ledger>(State(state): State<Arc<AppState<L>>>) -> impl IntoResponse {
    let ledger = state.service.readiness().await;

    let (status, body) = match &ledger {
        LedgerStatus::Unavailable(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ReadinessResponse {
                status: "not_ready".into(),
                ledger: ledger.as_str().into(),
                detail: Some(reason.clone()),
            },
        ),
        _ => (
            StatusCode::OK,
            ReadinessResponse {
                status: "ready".into(),
                ledger: ledger.as_str().into(),
                detail: None,
            },
        ),
    };

    (status, Json(body))
}

/// Charge a card.
#[tracing::instrument(skip_all)]
pub async fn charge<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    payload: Result<Json<ChargeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) =
        payload.map_err(|e| ChargeError::InvalidInput(format!("malformed request: {e}")))?;

    let resp = state.service.charge(req).await?;
    Ok(Json(resp))
}

/// Prometheus text exposition.
pub async fn metrics<L: Ledger>(State(state): State<Arc<AppState<L>>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.service.metrics().render(),
    )
}

/// OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ChargeError::InvalidInput("x".into()), 400),
            (ChargeError::FailedPrecondition("x".into()), 400),
            (ChargeError::Unauthenticated("x".into()), 401),
            (ChargeError::AlreadyExists("x".into()), 409),
            (ChargeError::ResourceExhausted("x".into()), 429),
            (ChargeError::Internal("x".into()), 500),
            (ChargeError::Unavailable("x".into()), 503),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status().as_u16(), expected);
        }
    }
}
