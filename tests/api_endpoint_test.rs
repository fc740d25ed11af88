use axum::body::Body;
use axum::http::{Request, StatusCode};
use p2p_exchange::api;
use p2p_exchange::config::ExchangeSettings;
use p2p_exchange::db::init_db;
use p2p_exchange::domain::{Decimal, TimeMs, TokenKind, UserId};
use p2p_exchange::{Exchange, ManualClock, Repository};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    exchange: Arc<Exchange>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let clock = ManualClock::new(TimeMs::new(1_700_000_000_000));
    let exchange = Arc::new(Exchange::new(
        repo,
        Arc::new(clock),
        ExchangeSettings::default(),
    ));
    let app = api::create_router(api::AppState::new(exchange.clone()));

    TestApp {
        app,
        exchange,
        _temp: temp_dir,
    }
}

async fn fund(app: &TestApp, user: i64, token: TokenKind, amount: &str) {
    app.exchange
        .ledger()
        .credit(
            UserId::new(user),
            token,
            Decimal::from_str_canonical(amount).unwrap(),
        )
        .await
        .unwrap();
}

async fn call(
    app: &TestApp,
    method: &str,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn sell_not_order() -> Value {
    json!({
        "side": "sell",
        "tokenKind": "NOT",
        "quantity": "100",
        "unitPrice": "10",
        "minFill": "10",
        "paymentInfo": "IBAN DE00 1234"
    })
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = setup_test_app().await;
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, "GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let app = setup_test_app().await;
    let (status, body) = call(&app, "GET", "/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_full_trade_over_http() {
    let app = setup_test_app().await;
    fund(&app, 1, TokenKind::Not, "100").await;
    fund(&app, 2, TokenKind::Cf, "1000").await;

    let (status, order) = call(&app, "POST", "/v1/orders", Some(1), Some(sell_not_order())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["quantity"], "100");
    assert_eq!(order["totalPrice"], "1000");
    assert_eq!(order["paymentToken"], "CF");
    assert_eq!(order["status"], "active");
    assert_eq!(order["expiresIn"], 259_200);
    let order_id = order["id"].as_i64().unwrap();

    let (status, listed) = call(&app, "GET", "/v1/orders?excludeOwn=true", Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed["orders"].as_array().unwrap().is_empty());

    let (status, listed) = call(&app, "GET", "/v1/orders?side=sell&tokenKind=NOT", Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["orders"].as_array().unwrap().len(), 1);

    let (status, deal) = call(
        &app,
        "POST",
        &format!("/v1/orders/{}/accept", order_id),
        Some(2),
        Some(json!({"quantity": "40"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(deal["commission"], "12");
    assert_eq!(deal["consideration"], "400");
    assert_eq!(deal["role"], "buyer");
    assert_eq!(deal["status"], "pending");
    let deal_id = deal["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/transactions/{}/confirm-receipt", deal_id),
        Some(1),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/v1/transactions/{}/confirm-payment", deal_id),
        Some(2),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, deal) = call(
        &app,
        "POST",
        &format!("/v1/transactions/{}/confirm-receipt", deal_id),
        Some(1),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["status"], "completed");
    assert_eq!(deal["role"], "seller");

    let (status, account) = call(&app, "GET", "/v1/accounts/1", Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["balances"]["CF"], "400");
    assert_eq!(account["balances"]["NOT"], "0");
    assert_eq!(account["balances"]["TON"], "0");

    let (status, account) = call(&app, "GET", "/v1/accounts/2", Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["balances"]["CF"], "588");
    assert_eq!(account["balances"]["NOT"], "40");

    let (status, _) = call(&app, "GET", "/v1/accounts/2", Some(1), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, txs) = call(&app, "GET", "/v1/transactions?status=completed", Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(txs["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_numeric_amounts_rejected() {
    let app = setup_test_app().await;
    fund(&app, 1, TokenKind::Not, "100").await;

    let mut body = sell_not_order();
    body["quantity"] = json!(100);
    let (status, resp) = call(&app, "POST", "/v1/orders", Some(1), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "invalid_input");
}

#[tokio::test]
async fn test_error_mapping() {
    let app = setup_test_app().await;
    fund(&app, 1, TokenKind::Not, "50").await;

    let (status, body) = call(&app, "POST", "/v1/orders", Some(1), Some(sell_not_order())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_funds");

    let (status, body) = call(&app, "GET", "/v1/orders/999", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let mut smaller = sell_not_order();
    smaller["quantity"] = json!("50");
    let (_, order) = call(&app, "POST", "/v1/orders", Some(1), Some(smaller)).await;
    let order_id = order["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/orders/{}/accept", order_id),
        Some(1),
        Some(json!({"quantity": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "self_trade");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/orders/{}/cancel", order_id),
        Some(2),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_owner");

    let (status, _) = call(&app, "GET", "/v1/orders?minPrice=abc", Some(1), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_messages_over_http() {
    let app = setup_test_app().await;
    fund(&app, 1, TokenKind::Not, "100").await;
    fund(&app, 2, TokenKind::Cf, "1000").await;

    let (_, order) = call(&app, "POST", "/v1/orders", Some(1), Some(sell_not_order())).await;
    let (_, deal) = call(
        &app,
        "POST",
        &format!("/v1/orders/{}/accept", order["id"]),
        Some(2),
        Some(json!({"quantity": "10"})),
    )
    .await;
    let messages_uri = format!("/v1/transactions/{}/messages", deal["id"]);

    let (status, msg) = call(&app, "POST", &messages_uri, Some(2), Some(json!({"content": " paid "}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(msg["content"], "paid");
    assert_eq!(msg["isRead"], false);

    let (status, body) = call(&app, "POST", &messages_uri, Some(2), Some(json!({"content": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_content");

    let (status, body) = call(&app, "POST", &messages_uri, Some(3), Some(json!({"content": "hi"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = call(&app, "GET", &format!("{}/unread", messages_uri), Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread"], 1);

    let (status, body) = call(&app, "POST", &format!("{}/read", messages_uri), Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 1);

    let (status, body) = call(&app, "GET", &messages_uri, Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["isRead"], true);
    assert_eq!(messages[0]["senderId"], 2);
}

#[tokio::test]
async fn test_cancelled_order_can_be_activated_again() {
    let app = setup_test_app().await;
    fund(&app, 1, TokenKind::Not, "100").await;

    let (_, order) = call(&app, "POST", "/v1/orders", Some(1), Some(sell_not_order())).await;
    let order_uri = format!("/v1/orders/{}", order["id"]);

    let (status, cancelled) = call(&app, "POST", &format!("{}/cancel", order_uri), Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, body) = call(&app, "POST", &format!("{}/activate", order_uri), Some(2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_owner");

    let (status, active) = call(&app, "POST", &format!("{}/activate", order_uri), Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["status"], "active");
    assert_eq!(active["expiresIn"], 259_200);

    let (_, account) = call(&app, "GET", "/v1/accounts/1", Some(1), None).await;
    assert_eq!(account["balances"]["NOT"], "0");

    let (status, body) = call(&app, "POST", &format!("{}/activate", order_uri), Some(1), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");
}
