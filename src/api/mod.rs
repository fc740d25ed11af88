pub mod accounts;
pub mod auth;
pub mod health;
pub mod messages;
pub mod orders;
pub mod transactions;

use crate::error::AppError;
use crate::exchange::Exchange;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<Exchange>,
}

impl AppState {
    pub fn new(exchange: Arc<Exchange>) -> Self {
        Self { exchange }
    }
}

/// Unwrap a JSON body, reporting malformed input in the API's error shape.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/v1/orders/mine", get(orders::list_my_orders))
        .route("/v1/orders/:id", get(orders::get_order))
        .route("/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/v1/orders/:id/extend", post(orders::extend_order))
        .route("/v1/orders/:id/activate", post(orders::activate_order))
        .route("/v1/orders/:id/accept", post(orders::accept_order))
        .route("/v1/transactions", get(transactions::list_transactions))
        .route("/v1/transactions/:id", get(transactions::get_transaction))
        .route(
            "/v1/transactions/:id/confirm-payment",
            post(transactions::confirm_payment),
        )
        .route(
            "/v1/transactions/:id/confirm-receipt",
            post(transactions::confirm_receipt),
        )
        .route(
            "/v1/transactions/:id/cancel",
            post(transactions::cancel_transaction),
        )
        .route(
            "/v1/transactions/:id/messages",
            get(messages::list_messages).post(messages::post_message),
        )
        .route(
            "/v1/transactions/:id/messages/read",
            post(messages::mark_read),
        )
        .route(
            "/v1/transactions/:id/messages/unread",
            get(messages::unread_count),
        )
        .route("/v1/accounts/:id", get(accounts::get_account))
        .route("/v1/accounts/:id/journal", get(accounts::get_journal))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
