//! Balance rows and the journal.

use crate::domain::{
    DealId, Decimal, EntryReason, EntryRef, JournalEntry, OrderId, TimeMs, TokenKind, UserId,
};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use std::collections::BTreeMap;

use super::{parsed, Repository};

/// Take the write lock on a `(user, token)` balance row and return its amount.
///
/// Creates a zero row if the account has never held the token.
pub async fn lock_balance(
    conn: &mut SqliteConnection,
    user: UserId,
    token: TokenKind,
    now: TimeMs,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO balances (user_id, token_kind, amount, version, updated_at)
        VALUES (?, ?, '0', 0, ?)
        ON CONFLICT(user_id, token_kind) DO UPDATE SET version = version + 1
        "#,
    )
    .bind(user.as_i64())
    .bind(token.as_str())
    .bind(now.as_ms())
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query("SELECT amount FROM balances WHERE user_id = ? AND token_kind = ?")
        .bind(user.as_i64())
        .bind(token.as_str())
        .fetch_one(&mut *conn)
        .await?;

    parsed(&row, "amount")
}

/// Overwrite a balance previously locked with [`lock_balance`].
pub async fn store_balance(
    conn: &mut SqliteConnection,
    user: UserId,
    token: TokenKind,
    amount: Decimal,
    now: TimeMs,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE balances SET amount = ?, updated_at = ? WHERE user_id = ? AND token_kind = ?",
    )
    .bind(amount.to_canonical_string())
    .bind(now.as_ms())
    .bind(user.as_i64())
    .bind(token.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_journal_entry(
    conn: &mut SqliteConnection,
    user: UserId,
    token: TokenKind,
    delta: Decimal,
    balance_after: Decimal,
    reason: EntryReason,
    reference: EntryRef,
    now: TimeMs,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO journal_entries (
            user_id, token_kind, delta, balance_after, reason, order_id, deal_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.as_i64())
    .bind(token.as_str())
    .bind(delta.to_canonical_string())
    .bind(balance_after.to_canonical_string())
    .bind(reason.as_str())
    .bind(reference.order_id.map(|id| id.0))
    .bind(reference.deal_id.map(|id| id.0))
    .bind(now.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

impl Repository {
    /// Current free balance; zero for accounts that never held the token.
    pub async fn balance(&self, user: UserId, token: TokenKind) -> Result<Decimal, sqlx::Error> {
        let row = sqlx::query("SELECT amount FROM balances WHERE user_id = ? AND token_kind = ?")
            .bind(user.as_i64())
            .bind(token.as_str())
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => parsed(&row, "amount"),
            None => Ok(Decimal::zero()),
        }
    }

    /// All three balances for a user, zero-filled.
    pub async fn balances_for(
        &self,
        user: UserId,
    ) -> Result<BTreeMap<TokenKind, Decimal>, sqlx::Error> {
        let rows = sqlx::query("SELECT token_kind, amount FROM balances WHERE user_id = ?")
            .bind(user.as_i64())
            .fetch_all(self.pool())
            .await?;

        let mut balances: BTreeMap<TokenKind, Decimal> = TokenKind::ALL
            .iter()
            .map(|token| (*token, Decimal::zero()))
            .collect();
        for row in &rows {
            let token: TokenKind = parsed(row, "token_kind")?;
            balances.insert(token, parsed(row, "amount")?);
        }

        Ok(balances)
    }

    /// Sum of free balances of one token across all users.
    ///
    /// Summed in Rust: SQLite would coerce the TEXT amounts to REAL.
    pub async fn total_supply(&self, token: TokenKind) -> Result<Decimal, sqlx::Error> {
        let rows = sqlx::query("SELECT amount FROM balances WHERE token_kind = ?")
            .bind(token.as_str())
            .fetch_all(self.pool())
            .await?;

        rows.iter()
            .map(|row| parsed::<Decimal>(row, "amount"))
            .sum::<Result<Decimal, sqlx::Error>>()
    }

    /// Net of every journal delta recorded for `reason` in one token.
    pub async fn journal_total(
        &self,
        reason: EntryReason,
        token: TokenKind,
    ) -> Result<Decimal, sqlx::Error> {
        let rows = sqlx::query("SELECT delta FROM journal_entries WHERE reason = ? AND token_kind = ?")
            .bind(reason.as_str())
            .bind(token.as_str())
            .fetch_all(self.pool())
            .await?;

        rows.iter()
            .map(|row| parsed::<Decimal>(row, "delta"))
            .sum::<Result<Decimal, sqlx::Error>>()
    }

    /// Most recent journal entries for a user, newest first.
    pub async fn journal(
        &self,
        user: UserId,
        limit: i64,
    ) -> Result<Vec<JournalEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, token_kind, delta, balance_after, reason, order_id, deal_id, created_at
            FROM journal_entries
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user.as_i64())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(JournalEntry {
                    id: row.try_get("id")?,
                    user_id: UserId::new(row.try_get("user_id")?),
                    token_kind: parsed(row, "token_kind")?,
                    delta: parsed(row, "delta")?,
                    balance_after: parsed(row, "balance_after")?,
                    reason: parsed(row, "reason")?,
                    reference: EntryRef {
                        order_id: row.try_get::<Option<i64>, _>("order_id")?.map(OrderId),
                        deal_id: row.try_get::<Option<i64>, _>("deal_id")?.map(DealId),
                    },
                    created_at: TimeMs::new(row.try_get("created_at")?),
                })
            })
            .collect()
    }
}
