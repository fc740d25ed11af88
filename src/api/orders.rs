use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::auth::Requester;
use super::transactions::TransactionDto;
use super::{json_body, AppState};
use crate::domain::{
    Decimal, NewOrder, Order, OrderFilter, OrderId, OrderStatus, Side, TimeMs, TokenKind,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub side: Option<String>,
    pub token_kind: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub exclude_own: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: i64,
    pub owner_id: i64,
    pub side: Side,
    pub token_kind: TokenKind,
    pub payment_token: TokenKind,
    pub quantity: String,
    pub original_quantity: String,
    pub unit_price: String,
    pub min_fill: String,
    pub total_price: String,
    pub payment_info: String,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl OrderDto {
    pub fn from_order(order: &Order, now: TimeMs) -> Self {
        OrderDto {
            id: order.id.0,
            owner_id: order.owner.as_i64(),
            side: order.side,
            token_kind: order.token_kind,
            payment_token: order.token_kind.counter_token(),
            quantity: order.quantity.to_canonical_string(),
            original_quantity: order.original_quantity.to_canonical_string(),
            unit_price: order.unit_price.to_canonical_string(),
            min_fill: order.minimum_fill_quantity().to_canonical_string(),
            total_price: order.total_price().to_canonical_string(),
            payment_info: order.payment_info.clone(),
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            expires_at: order.expires_at.to_rfc3339(),
            expires_in: order.expires_in_secs(now),
            completed_at: order.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderDto>,
}

fn parse_param<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", name, raw))),
    }
}

fn order_list(state: &AppState, orders: &[Order]) -> OrdersResponse {
    let now = state.exchange.now();
    OrdersResponse {
        orders: orders.iter().map(|o| OrderDto::from_order(o, now)).collect(),
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    Requester(user): Requester,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderDto>), AppError> {
    let new_order = json_body(payload)?;
    let order = state.exchange.create_order(user, new_order).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderDto::from_order(&order, state.exchange.now())),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Requester(user): Requester,
    Query(params): Query<OrdersQuery>,
) -> Result<Json<OrdersResponse>, AppError> {
    let filter = OrderFilter {
        side: parse_param(params.side.as_deref(), "side")?,
        token_kind: parse_param(params.token_kind.as_deref(), "tokenKind")?,
        min_price: parse_param(params.min_price.as_deref(), "minPrice")?,
        max_price: parse_param(params.max_price.as_deref(), "maxPrice")?,
        exclude_owner: params.exclude_own.unwrap_or(false).then_some(user),
    };
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(AppError::BadRequest("minPrice must be <= maxPrice".into()));
        }
    }

    let orders = state.exchange.list_active_orders(&filter).await?;
    Ok(Json(order_list(&state, &orders)))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    Requester(user): Requester,
    Query(params): Query<StatusQuery>,
) -> Result<Json<OrdersResponse>, AppError> {
    let status = parse_param::<OrderStatus>(params.status.as_deref(), "status")?;
    let orders = state.exchange.list_own_orders(user, status).await?;
    Ok(Json(order_list(&state, &orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Requester(_user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<OrderDto>, AppError> {
    let order = state.exchange.get_order(OrderId(id)).await?;
    Ok(Json(OrderDto::from_order(&order, state.exchange.now())))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<OrderDto>, AppError> {
    let order = state.exchange.cancel_order(OrderId(id), user).await?;
    Ok(Json(OrderDto::from_order(&order, state.exchange.now())))
}

pub async fn extend_order(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<OrderDto>, AppError> {
    let order = state.exchange.extend_order(OrderId(id), user).await?;
    Ok(Json(OrderDto::from_order(&order, state.exchange.now())))
}

pub async fn activate_order(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<OrderDto>, AppError> {
    let order = state.exchange.reactivate_order(OrderId(id), user).await?;
    Ok(Json(OrderDto::from_order(&order, state.exchange.now())))
}

pub async fn accept_order(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
    payload: Result<Json<AcceptRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionDto>), AppError> {
    let request = json_body(payload)?;
    let deal = state
        .exchange
        .accept_order(OrderId(id), user, request.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionDto::from_deal(&deal, user)),
    ))
}
