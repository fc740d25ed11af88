use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use super::auth::Requester;
use super::{json_body, AppState};
use crate::domain::{DealId, Message};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub transaction_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: String,
    pub is_read: bool,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        MessageDto {
            id: message.id.0,
            transaction_id: message.deal_id.0,
            sender_id: message.sender.as_i64(),
            content: message.content,
            created_at: message.created_at.to_rfc3339(),
            is_read: message.is_read,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageDto>,
}

pub async fn post_message(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageDto>), AppError> {
    let request = json_body(payload)?;
    let message = state
        .exchange
        .post_message(DealId(id), user, &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages: Vec<MessageDto> = state
        .exchange
        .list_messages(DealId(id), user)
        .await?
        .map_ok(MessageDto::from)
        .try_collect()
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let marked = state.exchange.mark_read(DealId(id), user).await?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Requester(user): Requester,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let unread = state.exchange.unread_count(DealId(id), user).await?;
    Ok(Json(serde_json::json!({ "unread": unread })))
}
