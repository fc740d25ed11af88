//! Order: a standing offer to buy or sell a quantity of one token at a fixed price.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::primitives::ParseCodeError;
use super::{Decimal, Side, TimeMs, TokenKind, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }

    /// Cancelled and expired orders hold no escrow and never reopen.
    pub fn is_closed(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Expired)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OrderStatus::Active),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            _ => Err(ParseCodeError::new("order status", s)),
        }
    }
}

/// A posted order.
///
/// `quantity` is what remains open. `min_fill` is the owner's requested
/// minimum; callers should use [`Order::minimum_fill_quantity`], which is
/// clamped to the remaining quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub owner: UserId,
    pub side: Side,
    pub token_kind: TokenKind,
    pub quantity: Decimal,
    pub original_quantity: Decimal,
    pub unit_price: Decimal,
    pub min_fill: Decimal,
    /// Rate fixed at creation; buy-order escrow and every fill use it.
    pub commission_rate: Decimal,
    pub payment_info: String,
    pub status: OrderStatus,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
    pub expires_at: TimeMs,
    pub completed_at: Option<TimeMs>,
}

impl Order {
    pub fn minimum_fill_quantity(&self) -> Decimal {
        self.min_fill.min(self.quantity)
    }

    /// `quantity × unit_price` for what remains open.
    pub fn total_price(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    pub fn is_expired_at(&self, now: TimeMs) -> bool {
        self.expires_at <= now
    }

    /// Active and not yet past its expiry.
    pub fn is_open_at(&self, now: TimeMs) -> bool {
        self.status == OrderStatus::Active && !self.is_expired_at(now)
    }

    /// Whole seconds until expiry, zero once expired.
    pub fn expires_in_secs(&self, now: TimeMs) -> i64 {
        ((self.expires_at.as_ms() - now.as_ms()) / 1000).max(0)
    }

    /// What the owner has locked for `quantity` units of this order.
    ///
    /// Sell orders lock the token itself. Buy orders lock consideration plus
    /// commission in the counter-token.
    pub fn escrow_for(&self, quantity: Decimal) -> (TokenKind, Decimal) {
        match self.side {
            Side::Sell => (self.token_kind, quantity),
            Side::Buy => (
                self.token_kind.counter_token(),
                quantity * self.unit_price + self.commission_for(quantity),
            ),
        }
    }

    /// Commission charged on a fill of `quantity` units.
    pub fn commission_for(&self, quantity: Decimal) -> Decimal {
        quantity * self.unit_price * self.commission_rate
    }
}

/// Validated input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub side: Side,
    pub token_kind: TokenKind,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub min_fill: Decimal,
    #[serde(default)]
    pub payment_info: String,
}

/// Filter for the public order listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub side: Option<Side>,
    pub token_kind: Option<TokenKind>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub exclude_owner: Option<UserId>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.side.map_or(true, |s| s == order.side)
            && self.token_kind.map_or(true, |t| t == order.token_kind)
            && self.min_price.map_or(true, |p| order.unit_price >= p)
            && self.max_price.map_or(true, |p| order.unit_price <= p)
            && self.exclude_owner.map_or(true, |u| u != order.owner)
    }
}
