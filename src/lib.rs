pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CancelPolicy, Config, ExchangeSettings};
pub use db::{init_db, Repository};
pub use domain::{
    Deal, DealId, DealStatus, Decimal, Message, NewOrder, Order, OrderFilter, OrderId,
    OrderStatus, Side, TimeMs, TokenKind, UserId,
};
pub use error::AppError;
pub use exchange::{EscrowSummary, Exchange, ExchangeError};
pub use ledger::{Ledger, UserBalances};
