//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use charge_types::domain::{CardInfo, Money};
use charge_types::dto::{ChargeRequest, ChargeResponse, ErrorResponse, ReadinessResponse};
use utoipa::OpenApi;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Process is alive", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "health",
    responses(
        (status = 200, description = "Ledger reachable, or running simulated", body = ReadinessResponse),
        (status = 503, description = "Ledger unreachable", body = ReadinessResponse)
    )
)]
async fn ready() {}

/// Prometheus metrics
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses(
        (status = 200, description = "Prometheus text exposition", body = String, content_type = "text/plain")
    )
)]
async fn metrics() {}

/// Charge a card
#[utoipa::path(
    post,
    path = "/api/charge",
    tag = "charge",
    request_body = ChargeRequest,
    responses(
        (status = 200, description = "Charge accepted by the ledger", body = ChargeResponse),
        (status = 400, description = "Invalid request or insufficient funds", body = ErrorResponse),
        (status = 401, description = "Ledger rejected the service credential", body = ErrorResponse),
        (status = 409, description = "Duplicate transaction; it may already have been applied", body = ErrorResponse),
        (status = 429, description = "Too many charges for this payer", body = ErrorResponse),
        (status = 500, description = "Ledger or internal failure", body = ErrorResponse),
        (status = 503, description = "Ledger unreachable; outcome unknown on timeout", body = ErrorResponse)
    )
)]
async fn charge() {}

/// OpenAPI documentation for the charge API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Charge Adapter API",
        version = "1.0.0",
        description = "Charges a card by submitting a transfer from the card's ledger account to the merchant account.\n\nThe returned `transaction_id` is the ledger idempotency key. Resubmitting after a timeout may yield `409 ALREADY_EXISTS`.",
        license(name = "MIT"),
    ),
    paths(health, ready, metrics, charge),
    components(
        schemas(
            ChargeRequest,
            ChargeResponse,
            ErrorResponse,
            ReadinessResponse,
            Money,
            CardInfo,
        )
    ),
    tags(
        (name = "health", description = "Liveness, readiness and metrics"),
        (name = "charge", description = "Card charges"),
    )
)]
pub struct ApiDoc;
