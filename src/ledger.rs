//! Ledger: balance storage and the atomic credit/debit/transfer primitives.
//!
//! Balances are keyed by `(user, token)` and never go negative. Every movement
//! appends a journal entry in the same storage transaction.
//!
//! The public methods each run as their own storage transaction. The
//! `credit_in`/`debit_in` functions join a transaction the caller already
//! holds, which is how order and deal operations make their fund movements
//! part of one atomic unit.

use crate::clock::Clock;
use crate::db::repo::balances::{insert_journal_entry, lock_balance, store_balance};
use crate::db::Repository;
use crate::domain::{Decimal, EntryReason, EntryRef, JournalEntry, TimeMs, TokenKind, UserId};
use crate::exchange::ExchangeError;
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Snapshot returned by `GetUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalances {
    pub user_id: UserId,
    pub balances: BTreeMap<TokenKind, Decimal>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    repo: Arc<Repository>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(repo: Arc<Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Increase a balance. Returns the new balance.
    pub async fn credit(
        &self,
        user: UserId,
        token: TokenKind,
        amount: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        let now = self.clock.now();
        let balance = async {
            let mut tx = self.repo.begin().await?;
            let balance = credit_in(
                &mut tx,
                user,
                token,
                amount,
                EntryReason::Deposit,
                EntryRef::none(),
                now,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, ExchangeError>(balance)
        }
        .await
        .map_err(ExchangeError::into_settlement)?;

        info!(user_id = %user, token = %token, amount = %amount, balance = %balance, "Credited balance");
        Ok(balance)
    }

    /// Decrease a balance, failing with `InsufficientFunds` rather than going negative.
    pub async fn debit(
        &self,
        user: UserId,
        token: TokenKind,
        amount: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        let now = self.clock.now();
        let balance = async {
            let mut tx = self.repo.begin().await?;
            let balance = debit_in(
                &mut tx,
                user,
                token,
                amount,
                EntryReason::Withdrawal,
                EntryRef::none(),
                now,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, ExchangeError>(balance)
        }
        .await
        .map_err(ExchangeError::into_settlement)?;

        info!(user_id = %user, token = %token, amount = %amount, balance = %balance, "Debited balance");
        Ok(balance)
    }

    /// Move `amount` from one user to another as a single unit.
    pub async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        token: TokenKind,
        amount: Decimal,
    ) -> Result<(), ExchangeError> {
        if from == to {
            return Err(ExchangeError::InvalidInput(
                "cannot transfer to the same account".to_string(),
            ));
        }

        let now = self.clock.now();
        async {
            let mut tx = self.repo.begin().await?;
            debit_in(
                &mut tx,
                from,
                token,
                amount,
                EntryReason::Transfer,
                EntryRef::none(),
                now,
            )
            .await?;
            credit_in(
                &mut tx,
                to,
                token,
                amount,
                EntryReason::Transfer,
                EntryRef::none(),
                now,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, ExchangeError>(())
        }
        .await
        .map_err(ExchangeError::into_settlement)?;

        info!(from = %from, to = %to, token = %token, amount = %amount, "Transferred balance");
        Ok(())
    }

    pub async fn balance(&self, user: UserId, token: TokenKind) -> Result<Decimal, ExchangeError> {
        Ok(self.repo.balance(user, token).await?)
    }

    pub async fn get_user(&self, user: UserId) -> Result<UserBalances, ExchangeError> {
        let balances = self.repo.balances_for(user).await?;
        debug!(user_id = %user, "Loaded balances");
        Ok(UserBalances {
            user_id: user,
            balances,
        })
    }

    /// Sum of free balances of `token` across all users.
    pub async fn total_supply(&self, token: TokenKind) -> Result<Decimal, ExchangeError> {
        Ok(self.repo.total_supply(token).await?)
    }

    pub async fn journal(
        &self,
        user: UserId,
        limit: i64,
    ) -> Result<Vec<JournalEntry>, ExchangeError> {
        Ok(self.repo.journal(user, limit.clamp(1, 1000)).await?)
    }
}

fn require_positive(amount: Decimal) -> Result<(), ExchangeError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(ExchangeError::InvalidInput(format!(
            "amount must be positive, got {}",
            amount
        )))
    }
}

/// Credit inside an open storage transaction.
pub(crate) async fn credit_in(
    conn: &mut SqliteConnection,
    user: UserId,
    token: TokenKind,
    amount: Decimal,
    reason: EntryReason,
    reference: EntryRef,
    now: TimeMs,
) -> Result<Decimal, ExchangeError> {
    require_positive(amount)?;

    let current = lock_balance(conn, user, token, now).await?;
    let updated = current.checked_add(amount).ok_or_else(|| {
        ExchangeError::InvalidInput(format!("credit of {} overflows balance", amount))
    })?;
    store_balance(conn, user, token, updated, now).await?;
    insert_journal_entry(conn, user, token, amount, updated, reason, reference, now).await?;

    Ok(updated)
}

/// Debit inside an open storage transaction.
pub(crate) async fn debit_in(
    conn: &mut SqliteConnection,
    user: UserId,
    token: TokenKind,
    amount: Decimal,
    reason: EntryReason,
    reference: EntryRef,
    now: TimeMs,
) -> Result<Decimal, ExchangeError> {
    require_positive(amount)?;

    let current = lock_balance(conn, user, token, now).await?;
    if current < amount {
        return Err(ExchangeError::InsufficientFunds {
            user,
            token,
            needed: amount,
            available: current,
        });
    }
    let updated = current - amount;
    store_balance(conn, user, token, updated, now).await?;
    insert_journal_entry(conn, user, token, -amount, updated, reason, reference, now).await?;

    Ok(updated)
}
