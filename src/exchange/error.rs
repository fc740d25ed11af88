use crate::domain::{Decimal, TokenKind, UserId};
use thiserror::Error;

/// Every way an exchange operation can fail.
///
/// All variants except `SettlementFailed` and `Storage` are raised before any
/// write is committed, so the caller can rely on state being untouched.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient {token} balance for user {user}: needed {needed}, available {available}")]
    InsufficientFunds {
        user: UserId,
        token: TokenKind,
        needed: Decimal,
        available: Decimal,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("only the owner may modify this order")]
    NotOwner,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("cannot trade against your own order")]
    SelfTrade,
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("message content is empty")]
    EmptyContent,
    #[error("settlement failed and was rolled back: {0}")]
    SettlementFailed(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ExchangeError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::InvalidInput(_) => "invalid_input",
            ExchangeError::InsufficientFunds { .. } => "insufficient_funds",
            ExchangeError::NotFound(_) => "not_found",
            ExchangeError::NotOwner => "not_owner",
            ExchangeError::Forbidden(_) => "forbidden",
            ExchangeError::InvalidState(_) => "invalid_state",
            ExchangeError::SelfTrade => "self_trade",
            ExchangeError::InvalidQuantity(_) => "invalid_quantity",
            ExchangeError::EmptyContent => "empty_content",
            ExchangeError::SettlementFailed(_) => "settlement_failed",
            ExchangeError::Storage(_) => "storage",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::SettlementFailed(_) | ExchangeError::Storage(_)
        )
    }

    /// Storage failures inside an atomic unit surface as `SettlementFailed`.
    pub(crate) fn into_settlement(self) -> Self {
        match self {
            ExchangeError::Storage(e) => ExchangeError::SettlementFailed(e.to_string()),
            other => other,
        }
    }
}
