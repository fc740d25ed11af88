//! The exchange core: order book, matching, deal settlement and deal chat.
//!
//! Every mutating operation runs as one storage transaction that starts by
//! writing to the row it is about to change. That write takes the database
//! write lock, so the reads that follow are current and the unit is
//! serialized against every other mutation. Validation happens inside the
//! unit; returning early drops the transaction and rolls back the lock write.

pub mod audit;
pub mod deals;
pub mod error;
pub mod messaging;
pub mod order_book;
pub mod settlement;

pub use audit::EscrowSummary;
pub use error::ExchangeError;

use crate::clock::Clock;
use crate::config::ExchangeSettings;
use crate::db::Repository;
use crate::domain::TimeMs;
use crate::ledger::Ledger;
use std::sync::Arc;
use tracing::warn;

/// Close out an atomic unit's result. Storage failures become `SettlementFailed`.
fn finish_unit<T>(operation: &'static str, result: Result<T, ExchangeError>) -> Result<T, ExchangeError> {
    result.map_err(|err| {
        let err = err.into_settlement();
        if err.is_retryable() {
            warn!(operation, error = %err, "Storage failure, unit rolled back");
        }
        err
    })
}

#[derive(Debug, Clone)]
pub struct Exchange {
    repo: Arc<Repository>,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    settings: ExchangeSettings,
}

impl Exchange {
    pub fn new(repo: Arc<Repository>, clock: Arc<dyn Clock>, settings: ExchangeSettings) -> Self {
        let ledger = Ledger::new(repo.clone(), clock.clone());
        Self {
            repo,
            ledger,
            clock,
            settings,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn now(&self) -> TimeMs {
        self.clock.now()
    }
}
