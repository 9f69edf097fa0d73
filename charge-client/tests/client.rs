//! Client SDK against an in-process stand-in for the charge API.

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use charge_client::{ChargeClient, ClientError};
use charge_types::{CardInfo, ChargeRequest, Money};
use tokio::net::TcpListener;

async fn spawn(router: Router) -> ChargeClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    ChargeClient::new(format!("http://{addr}"))
}

#[tokio::test]
async fn test_charge_round_trip() {
    let router = Router::new().route(
        "/api/charge",
        post(|Json(req): Json<ChargeRequest>| async move {
            let amount = req.amount.unwrap();
            let card = req.credit_card.unwrap();
            assert_eq!(amount.units, 12);
            assert_eq!(amount.nanos, 340_000_000);
            assert_eq!(card.credit_card_number, "4111111111111111");
            Json(serde_json::json!({ "transaction_id": "abc-123" }))
        }),
    );
    let client = spawn(router).await;

    let resp = client
        .charge(
            Money::new(12, 340_000_000, "USD"),
            CardInfo::new("4111111111111111"),
        )
        .await
        .unwrap();
    assert_eq!(resp.transaction_id, "abc-123");
}

#[tokio::test]
async fn test_charge_error_carries_reason() {
    let router = Router::new().route(
        "/api/charge",
        post(|| async {
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "error": "duplicate transaction",
                    "code": 409,
                    "reason": "ALREADY_EXISTS"
                })),
            )
        }),
    );
    let client = spawn(router).await;

    let err = client
        .charge(Money::new(1, 0, "USD"), CardInfo::new("4111111111111111"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api { status: 409, ref reason, .. } if reason == "ALREADY_EXISTS"
    ));
}

#[tokio::test]
async fn test_health_and_ready() {
    let router = Router::new()
        .route(
            "/healthz",
            get(|| async { Json(serde_json::json!({ "status": "healthy" })) }),
        )
        .route(
            "/readyz",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "not_ready",
                        "ledger": "unavailable",
                        "detail": "connection refused"
                    })),
                )
            }),
        );
    let client = spawn(router).await;

    assert!(client.health().await.unwrap());

    let ready = client.ready().await.unwrap();
    assert_eq!(ready.status, "not_ready");
    assert_eq!(ready.ledger, "unavailable");
    assert_eq!(ready.detail.as_deref(), Some("connection refused"));
}
