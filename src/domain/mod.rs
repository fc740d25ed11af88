//! Domain types for the P2P exchange.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, UserId, TokenKind, Side
//! - Orders, deals and deal messages
//! - Journal entries for the balance audit trail

pub mod deal;
pub mod decimal;
pub mod journal;
pub mod message;
pub mod order;
pub mod primitives;

pub use deal::{Deal, DealId, DealStatus};
pub use decimal::Decimal;
pub use journal::{EntryReason, EntryRef, JournalEntry};
pub use message::{Message, MessageId};
pub use order::{NewOrder, Order, OrderFilter, OrderId, OrderStatus};
pub use primitives::{ParseCodeError, Side, TimeMs, TokenKind, UserId};
