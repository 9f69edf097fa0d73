//! Integration tests for the ledger client.
//!
//! Each test starts an in-process mock ledger on an ephemeral port and drives
//! the real HTTP client against it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use charge_ledger::{LedgerClient, ServiceAuthenticator};
use charge_types::{
    DerivedAccounts, Ledger, LedgerError, LedgerErrorKind, LedgerTransaction,
};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Recorded {
    authorization: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<Option<serde_json::Value>>>,
}

async fn spawn_ledger(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn authenticator() -> Arc<ServiceAuthenticator> {
    Arc::new(
        ServiceAuthenticator::from_key_data(
            include_bytes!("../testdata/service_pkcs1.pem"),
            include_bytes!("../testdata/service_spki.pub.pem"),
            Duration::from_secs(3600),
        )
        .unwrap(),
    )
}

fn transaction() -> LedgerTransaction {
    let accounts = DerivedAccounts {
        payer_account: "5112830366".into(),
        payer_routing: "123456789".into(),
        payee_account: "1111111111".into(),
        payee_routing: "123456789".into(),
    };
    LedgerTransaction::new(&accounts, 10_050, "0b5c8a8e-6f1e-4a57-9d8e-9b0f6f6f1a11")
}

fn responding(status: StatusCode, body: &'static str) -> Router {
    Router::new().route(
        "/transactions",
        post(move || async move { (status, body.to_string()) }),
    )
}

async fn client_for(router: Router) -> LedgerClient {
    let base = spawn_ledger(router).await;
    LedgerClient::new(base, authenticator()).unwrap()
}

#[tokio::test]
async fn test_create_transaction_sends_token_and_body() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route(
            "/transactions",
            post(
                |State(rec): State<Recorded>,
                 headers: HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    *rec.authorization.lock().unwrap() = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *rec.body.lock().unwrap() = Some(body);
                    (
                        StatusCode::CREATED,
                        Json(serde_json::json!({
                            "transactionId": 77,
                            "fromAccountNum": "5112830366",
                            "toAccountNum": "1111111111",
                            "amount": 10050
                        })),
                    )
                },
            ),
        )
        .with_state(recorded.clone());

    let auth = authenticator();
    let base = spawn_ledger(router).await;
    let client = LedgerClient::new(base, auth.clone()).unwrap();

    let receipt = client.create_transaction(&transaction()).await.unwrap();
    assert_eq!(receipt.transaction_id, Some(77));
    assert_eq!(receipt.amount, 10_050);

    let header = recorded.authorization.lock().unwrap().clone().unwrap();
    let token = header.strip_prefix("Bearer ").unwrap();
    let claims = auth.verify(token).unwrap();
    assert_eq!(claims.acct, "5112830366");

    let body = recorded.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["fromAccountNum"], "5112830366");
    assert_eq!(body["fromRoutingNum"], "123456789");
    assert_eq!(body["toAccountNum"], "1111111111");
    assert_eq!(body["toRoutingNum"], "123456789");
    assert_eq!(body["amount"], 10050);
    assert_eq!(body["uuid"], "0b5c8a8e-6f1e-4a57-9d8e-9b0f6f6f1a11");
}

#[tokio::test]
async fn test_created_without_body_synthesizes_receipt() {
    let client = client_for(responding(StatusCode::CREATED, "")).await;

    let receipt = client.create_transaction(&transaction()).await.unwrap();
    assert_eq!(receipt.transaction_id, None);
    assert_eq!(receipt.from_account_num, "5112830366");
    assert_eq!(receipt.to_account_num, "1111111111");
    assert_eq!(receipt.amount, 10_050);
}

#[tokio::test]
async fn test_ok_with_garbage_body_is_malformed() {
    let client = client_for(responding(StatusCode::OK, "not json")).await;

    let err = client.create_transaction(&transaction()).await.unwrap_err();
    assert!(matches!(err, LedgerError::MalformedResponse { status: 200, .. }));
    assert_eq!(err.kind(), LedgerErrorKind::Internal);
}

#[tokio::test]
async fn test_accepted_with_receipt_is_success() {
    let client = client_for(responding(
        StatusCode::ACCEPTED,
        r#"{"transactionId":77,"amount":100}"#,
    ))
    .await;

    let receipt = client.create_transaction(&transaction()).await.unwrap();
    assert_eq!(receipt.transaction_id, Some(77));
    assert_eq!(receipt.amount, 100);
}

#[tokio::test]
async fn test_other_success_statuses_without_receipt_are_malformed() {
    for (status, body) in [
        (StatusCode::ACCEPTED, "queued"),
        (StatusCode::NO_CONTENT, ""),
    ] {
        let client = client_for(responding(status, body)).await;

        let err = client.create_transaction(&transaction()).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::MalformedResponse { status: s, .. } if s == status.as_u16()),
            "status {status}"
        );
        assert_eq!(err.kind(), LedgerErrorKind::Internal);
    }
}

#[tokio::test]
async fn test_pkcs8_and_pkcs1_keys_authenticate_ledger_calls() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route(
            "/transactions",
            post(|State(rec): State<Recorded>, headers: HeaderMap| async move {
                *rec.authorization.lock().unwrap() = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                StatusCode::CREATED
            }),
        )
        .with_state(recorded.clone());
    let base = spawn_ledger(router).await;

    let signer = Arc::new(
        ServiceAuthenticator::from_key_data(
            include_bytes!("../testdata/service_pkcs8.pem"),
            include_bytes!("../testdata/service_pkcs1.pub.pem"),
            Duration::from_secs(3600),
        )
        .unwrap(),
    );
    let client = LedgerClient::new(base, signer).unwrap();
    client.create_transaction(&transaction()).await.unwrap();

    let header = recorded.authorization.lock().unwrap().clone().unwrap();
    let token = header.strip_prefix("Bearer ").unwrap();
    let claims = authenticator().verify(token).unwrap();
    assert_eq!(claims.acct, "5112830366");
}

#[tokio::test]
async fn test_error_responses_are_classified() {
    let cases = [
        (StatusCode::UNAUTHORIZED, "", LedgerErrorKind::Unauthorized),
        (
            StatusCode::BAD_REQUEST,
            r#"{"error":"insufficient_funds","message":"balance too low"}"#,
            LedgerErrorKind::InsufficientFunds,
        ),
        (
            StatusCode::BAD_REQUEST,
            r#"{"error":"INSUFFICIENT_FUNDS"}"#,
            LedgerErrorKind::InsufficientFunds,
        ),
        (StatusCode::CONFLICT, "duplicate", LedgerErrorKind::DuplicateTransaction),
        (
            StatusCode::BAD_REQUEST,
            r#"{"error":"duplicate_transaction"}"#,
            LedgerErrorKind::DuplicateTransaction,
        ),
        (StatusCode::NOT_FOUND, "no such route", LedgerErrorKind::ClientError),
        (StatusCode::BAD_GATEWAY, "upstream", LedgerErrorKind::ServerError),
    ];

    for (status, body, expected) in cases {
        let client = client_for(responding(status, body)).await;
        let err = client.create_transaction(&transaction()).await.unwrap_err();
        assert_eq!(err.kind(), expected, "status {status} body {body:?}");
    }
}

#[tokio::test]
async fn test_insufficient_funds_code_needs_400() {
    let client = client_for(responding(
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"error":"insufficient_funds"}"#,
    ))
    .await;

    let err = client.create_transaction(&transaction()).await.unwrap_err();
    assert_eq!(err.kind(), LedgerErrorKind::ClientError);
}

#[tokio::test]
async fn test_timeout_is_unreachable() {
    let router = Router::new().route(
        "/transactions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            StatusCode::CREATED
        }),
    );
    let base = spawn_ledger(router).await;
    let client =
        LedgerClient::with_timeout(base, authenticator(), Duration::from_millis(200)).unwrap();

    let err = client.create_transaction(&transaction()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Unreachable { timed_out: true, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LedgerClient::new(format!("http://{addr}"), authenticator()).unwrap();

    let err = client.create_transaction(&transaction()).await.unwrap_err();
    assert!(err.is_unreachable());
    assert!(matches!(err, LedgerError::Unreachable { timed_out: false, .. }));
}

#[tokio::test]
async fn test_health_check_tracks_availability() {
    let ready = Arc::new(Mutex::new(false));
    let router = Router::new()
        .route(
            "/ready",
            get(|State(ready): State<Arc<Mutex<bool>>>| async move {
                if *ready.lock().unwrap() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        )
        .with_state(ready.clone());
    let client = client_for(router).await;

    assert!(client.is_available());
    assert!(client.health_check().await.is_err());
    assert!(!client.is_available());

    *ready.lock().unwrap() = true;
    assert!(client.health_check().await.is_ok());
    assert!(client.is_available());
}

#[tokio::test]
async fn test_check_balance() {
    let router = Router::new().route(
        "/balances/{account}",
        get(|Path(account): Path<String>| async move {
            if account == "5112830366" {
                Json(serde_json::json!({
                    "accountNum": account,
                    "routingNum": "123456789",
                    "balance": 250_000
                }))
                .into_response()
            } else {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": "account_not_found", "message": "unknown"})),
                )
                    .into_response()
            }
        }),
    );
    let client = client_for(router).await;

    let balance = client.check_balance("5112830366").await.unwrap();
    assert_eq!(balance.balance, 250_000);
    assert_eq!(balance.routing_num, "123456789");

    let err = client.check_balance("0000000000").await.unwrap_err();
    assert!(matches!(err, LedgerError::Remote { status: 404, ref code, .. } if code == "account_not_found"));
}
