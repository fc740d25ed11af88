//! Domain primitives: TimeMs, UserId, TokenKind, Side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Shift forward by `ms` milliseconds, saturating at the i64 bounds.
    pub fn plus_ms(&self, ms: i64) -> Self {
        TimeMs(self.0.saturating_add(ms))
    }

    /// RFC 3339 rendering for API payloads.
    pub fn to_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

/// Identifier of a user as provisioned by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        UserId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing an unknown enum code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseCodeError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseCodeError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        ParseCodeError {
            kind,
            value: value.to_string(),
        }
    }
}

/// The three fungible tokens traded on the exchange.
///
/// `Cf` is the primary token. It trades against `Ton`; every other token
/// trades against `Cf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Cf,
    Ton,
    Not,
}

impl TokenKind {
    pub const ALL: [TokenKind; 3] = [TokenKind::Cf, TokenKind::Ton, TokenKind::Not];

    /// Token in which consideration and commission for this token are paid.
    pub fn counter_token(&self) -> TokenKind {
        match self {
            TokenKind::Cf => TokenKind::Ton,
            TokenKind::Ton | TokenKind::Not => TokenKind::Cf,
        }
    }

    /// Maximum fractional digits accepted for quantities of this token.
    pub fn scale(&self) -> u32 {
        match self {
            TokenKind::Ton => 8,
            TokenKind::Cf | TokenKind::Not => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Cf => "CF",
            TokenKind::Ton => "TON",
            TokenKind::Not => "NOT",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CF" => Ok(TokenKind::Cf),
            "TON" => Ok(TokenKind::Ton),
            "NOT" => Ok(TokenKind::Not),
            _ => Err(ParseCodeError::new("token kind", s)),
        }
    }
}

/// Order side: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Owner wants to acquire the token.
    Buy,
    /// Owner wants to dispose of the token.
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(ParseCodeError::new("side", s)),
        }
    }
}
