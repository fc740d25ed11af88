//! Chat messages exchanged inside a deal.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DealId, TimeMs, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub deal_id: DealId,
    pub sender: UserId,
    pub content: String,
    pub created_at: TimeMs,
    pub is_read: bool,
}
