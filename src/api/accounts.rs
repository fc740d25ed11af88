use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::auth::Requester;
use super::AppState;
use crate::domain::{EntryReason, JournalEntry, TokenKind, UserId};
use crate::error::AppError;
use crate::exchange::ExchangeError;

const DEFAULT_JOURNAL_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub user_id: i64,
    pub balances: BTreeMap<TokenKind, String>,
}

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryDto {
    pub id: i64,
    pub token_kind: TokenKind,
    pub delta: String,
    pub balance_after: String,
    pub reason: EntryReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    pub created_at: String,
}

impl From<JournalEntry> for JournalEntryDto {
    fn from(entry: JournalEntry) -> Self {
        JournalEntryDto {
            id: entry.id,
            token_kind: entry.token_kind,
            delta: entry.delta.to_canonical_string(),
            balance_after: entry.balance_after.to_canonical_string(),
            reason: entry.reason,
            order_id: entry.reference.order_id.map(|id| id.0),
            transaction_id: entry.reference.deal_id.map(|id| id.0),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JournalResponse {
    pub entries: Vec<JournalEntryDto>,
}

fn own_account(requester: UserId, id: i64) -> Result<UserId, AppError> {
    if requester.as_i64() != id {
        return Err(ExchangeError::Forbidden("accounts are private to their owner".into()).into());
    }
    Ok(requester)
}

pub async fn get_account(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<AccountResponse>, AppError> {
    let user = own_account(user, id)?;
    let snapshot = state.exchange.ledger().get_user(user).await?;
    Ok(Json(AccountResponse {
        user_id: snapshot.user_id.as_i64(),
        balances: snapshot
            .balances
            .into_iter()
            .map(|(token, amount)| (token, amount.to_canonical_string()))
            .collect(),
    }))
}

pub async fn get_journal(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
    Query(params): Query<JournalQuery>,
) -> Result<Json<JournalResponse>, AppError> {
    let user = own_account(user, id)?;
    let entries = state
        .exchange
        .ledger()
        .journal(user, params.limit.unwrap_or(DEFAULT_JOURNAL_LIMIT))
        .await?;
    Ok(Json(JournalResponse {
        entries: entries.into_iter().map(JournalEntryDto::from).collect(),
    }))
}
