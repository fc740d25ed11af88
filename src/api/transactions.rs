use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use super::auth::Requester;
use super::orders::StatusQuery;
use super::AppState;
use crate::domain::{Deal, DealId, DealStatus, Side, TokenKind, UserId};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: i64,
    pub order_id: i64,
    pub order_side: Side,
    pub buyer_id: i64,
    pub seller_id: i64,
    /// The requester's side of the deal.
    pub role: &'static str,
    pub token_kind: TokenKind,
    pub payment_token: TokenKind,
    pub quantity: String,
    pub unit_price: String,
    pub consideration: String,
    pub commission: String,
    pub status: DealStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl TransactionDto {
    pub fn from_deal(deal: &Deal, viewer: UserId) -> Self {
        TransactionDto {
            id: deal.id.0,
            order_id: deal.order_id.0,
            order_side: deal.order_side,
            buyer_id: deal.buyer.as_i64(),
            seller_id: deal.seller.as_i64(),
            role: if viewer == deal.buyer { "buyer" } else { "seller" },
            token_kind: deal.token_kind,
            payment_token: deal.payment_token(),
            quantity: deal.quantity.to_canonical_string(),
            unit_price: deal.unit_price.to_canonical_string(),
            consideration: deal.consideration().to_canonical_string(),
            commission: deal.commission.to_canonical_string(),
            status: deal.status,
            created_at: deal.created_at.to_rfc3339(),
            updated_at: deal.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionDto>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Requester(user): Requester,
    Query(params): Query<StatusQuery>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<DealStatus>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
    };

    let deals = state.exchange.list_transactions(user, status).await?;
    Ok(Json(TransactionsResponse {
        transactions: deals
            .iter()
            .map(|deal| TransactionDto::from_deal(deal, user))
            .collect(),
    }))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<TransactionDto>, AppError> {
    let deal = state.exchange.get_transaction(DealId(id), user).await?;
    Ok(Json(TransactionDto::from_deal(&deal, user)))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<TransactionDto>, AppError> {
    let deal = state.exchange.confirm_payment(DealId(id), user).await?;
    Ok(Json(TransactionDto::from_deal(&deal, user)))
}

pub async fn confirm_receipt(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<TransactionDto>, AppError> {
    let deal = state.exchange.confirm_receipt(DealId(id), user).await?;
    Ok(Json(TransactionDto::from_deal(&deal, user)))
}

pub async fn cancel_transaction(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<TransactionDto>, AppError> {
    let deal = state.exchange.cancel_deal(DealId(id), user).await?;
    Ok(Json(TransactionDto::from_deal(&deal, user)))
}
