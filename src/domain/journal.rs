//! Journal entries: the append-only audit trail of every balance movement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::primitives::ParseCodeError;
use super::{DealId, Decimal, OrderId, TimeMs, TokenKind, UserId};

/// Why a balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// Credit from an external collaborator (income, purchase refund, admin top-up).
    Deposit,
    /// Debit by an external collaborator.
    Withdrawal,
    /// Funds locked when an order is posted.
    OrderEscrow,
    /// Order escrow handed back on cancel or expiry.
    OrderRelease,
    /// Funds locked by the counter-party when accepting an order.
    FillEscrow,
    /// Escrow handed back when a deal is cancelled.
    FillRefund,
    /// Escrow paid out to a participant when a deal completes.
    Settlement,
    /// Commission credited to the platform account.
    Commission,
    /// Direct user-to-user transfer.
    Transfer,
}

impl EntryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryReason::Deposit => "deposit",
            EntryReason::Withdrawal => "withdrawal",
            EntryReason::OrderEscrow => "order_escrow",
            EntryReason::OrderRelease => "order_release",
            EntryReason::FillEscrow => "fill_escrow",
            EntryReason::FillRefund => "fill_refund",
            EntryReason::Settlement => "settlement",
            EntryReason::Commission => "commission",
            EntryReason::Transfer => "transfer",
        }
    }
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryReason {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(EntryReason::Deposit),
            "withdrawal" => Ok(EntryReason::Withdrawal),
            "order_escrow" => Ok(EntryReason::OrderEscrow),
            "order_release" => Ok(EntryReason::OrderRelease),
            "fill_escrow" => Ok(EntryReason::FillEscrow),
            "fill_refund" => Ok(EntryReason::FillRefund),
            "settlement" => Ok(EntryReason::Settlement),
            "commission" => Ok(EntryReason::Commission),
            "transfer" => Ok(EntryReason::Transfer),
            _ => Err(ParseCodeError::new("entry reason", s)),
        }
    }
}

/// What a movement refers to, carried into the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryRef {
    pub order_id: Option<OrderId>,
    pub deal_id: Option<DealId>,
}

impl EntryRef {
    pub fn none() -> Self {
        EntryRef::default()
    }

    pub fn order(order_id: OrderId) -> Self {
        EntryRef {
            order_id: Some(order_id),
            deal_id: None,
        }
    }

    pub fn deal(order_id: OrderId, deal_id: DealId) -> Self {
        EntryRef {
            order_id: Some(order_id),
            deal_id: Some(deal_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: i64,
    pub user_id: UserId,
    pub token_kind: TokenKind,
    /// Signed change: positive for credits, negative for debits.
    pub delta: Decimal,
    pub balance_after: Decimal,
    pub reason: EntryReason,
    pub reference: EntryRef,
    pub created_at: TimeMs,
}
