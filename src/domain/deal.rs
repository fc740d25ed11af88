//! Deal: one fill of an order, settled through a two-party confirmation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::primitives::ParseCodeError;
use super::{Decimal, OrderId, Side, TimeMs, TokenKind, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(pub i64);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Pending,
    Paid,
    Completed,
    Cancelled,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Paid => "paid",
            DealStatus::Completed => "completed",
            DealStatus::Cancelled => "cancelled",
        }
    }

    /// Legal transitions of the settlement state machine.
    pub fn can_transition_to(&self, next: DealStatus) -> bool {
        matches!(
            (self, next),
            (DealStatus::Pending, DealStatus::Paid)
                | (DealStatus::Paid, DealStatus::Completed)
                | (DealStatus::Pending, DealStatus::Cancelled)
                | (DealStatus::Paid, DealStatus::Cancelled)
        )
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DealStatus::Pending),
            "paid" => Ok(DealStatus::Paid),
            "completed" => Ok(DealStatus::Completed),
            "cancelled" => Ok(DealStatus::Cancelled),
            _ => Err(ParseCodeError::new("deal status", s)),
        }
    }
}

/// A transaction between the owner of an order and the counter-party who accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub id: DealId,
    pub order_id: OrderId,
    pub order_side: Side,
    pub buyer: UserId,
    pub seller: UserId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub token_kind: TokenKind,
    pub commission: Decimal,
    pub status: DealStatus,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Deal {
    /// `quantity × unit_price`, before commission.
    pub fn consideration(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    pub fn payment_token(&self) -> TokenKind {
        self.token_kind.counter_token()
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        user == self.buyer || user == self.seller
    }

    /// The participant opposite `user`, if `user` takes part in the deal.
    pub fn counterpart_of(&self, user: UserId) -> Option<UserId> {
        if user == self.buyer {
            Some(self.seller)
        } else if user == self.seller {
            Some(self.buyer)
        } else {
            None
        }
    }

    /// The user who accepted the order, as opposed to the order's owner.
    pub fn taker(&self) -> UserId {
        match self.order_side {
            Side::Sell => self.buyer,
            Side::Buy => self.seller,
        }
    }

    pub fn maker(&self) -> UserId {
        match self.order_side {
            Side::Sell => self.seller,
            Side::Buy => self.buyer,
        }
    }

    /// What the taker locked when accepting: payment plus commission for a
    /// sell order, the traded token for a buy order.
    pub fn taker_escrow(&self) -> (TokenKind, Decimal) {
        match self.order_side {
            Side::Sell => (self.payment_token(), self.consideration() + self.commission),
            Side::Buy => (self.token_kind, self.quantity),
        }
    }

    /// The slice of the maker's order escrow this deal consumed.
    pub fn maker_escrow(&self) -> (TokenKind, Decimal) {
        match self.order_side {
            Side::Sell => (self.token_kind, self.quantity),
            Side::Buy => (self.payment_token(), self.consideration() + self.commission),
        }
    }
}
