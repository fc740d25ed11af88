use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::exchange::ExchangeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Exchange(ExchangeError::Storage(err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Exchange(err) => match err {
                ExchangeError::InvalidInput(_)
                | ExchangeError::InvalidQuantity(_)
                | ExchangeError::EmptyContent
                | ExchangeError::SelfTrade => StatusCode::BAD_REQUEST,
                ExchangeError::InsufficientFunds { .. } | ExchangeError::InvalidState(_) => {
                    StatusCode::CONFLICT
                }
                ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
                ExchangeError::NotOwner | ExchangeError::Forbidden(_) => StatusCode::FORBIDDEN,
                ExchangeError::SettlementFailed(_) | ExchangeError::Storage(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }

    /// Stable code placed in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "invalid_input",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Exchange(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
