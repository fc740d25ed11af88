//! Deal chat messages.

use crate::domain::{DealId, Message, MessageId, TimeMs, UserId};
use futures::stream::{BoxStream, StreamExt};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::Repository;

fn message_from_row(row: &SqliteRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: MessageId(row.try_get("id")?),
        deal_id: DealId(row.try_get("deal_id")?),
        sender: UserId::new(row.try_get("sender_id")?),
        content: row.try_get("content")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        is_read: row.try_get("is_read")?,
    })
}

impl Repository {
    pub async fn insert_message(
        &self,
        deal_id: DealId,
        sender: UserId,
        content: &str,
        now: TimeMs,
    ) -> Result<Message, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (deal_id, sender_id, content, created_at, is_read)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(deal_id.0)
        .bind(sender.as_i64())
        .bind(content)
        .bind(now.as_ms())
        .execute(self.pool())
        .await?;

        Ok(Message {
            id: MessageId(result.last_insert_rowid()),
            deal_id,
            sender,
            content: content.to_string(),
            created_at: now,
            is_read: false,
        })
    }

    /// Messages of a deal in posting order, decoded lazily as rows arrive.
    pub fn stream_messages(
        &self,
        deal_id: DealId,
    ) -> BoxStream<'_, Result<Message, sqlx::Error>> {
        sqlx::query(
            r#"
            SELECT id, deal_id, sender_id, content, created_at, is_read
            FROM messages
            WHERE deal_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(deal_id.0)
        .fetch(self.pool())
        .map(|row| row.and_then(|row| message_from_row(&row)))
        .boxed()
    }

    /// Mark every unread message sent by `sender` in the deal as read.
    ///
    /// Returns the number of messages that changed.
    pub async fn mark_read_from(&self, deal_id: DealId, sender: UserId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1 WHERE deal_id = ? AND sender_id = ? AND is_read = 0",
        )
        .bind(deal_id.0)
        .bind(sender.as_i64())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn unread_count_from(
        &self,
        deal_id: DealId,
        sender: UserId,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS unread FROM messages WHERE deal_id = ? AND sender_id = ? AND is_read = 0",
        )
        .bind(deal_id.0)
        .bind(sender.as_i64())
        .fetch_one(self.pool())
        .await?;

        row.try_get("unread")
    }

    pub async fn count_messages(&self, deal_id: DealId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM messages WHERE deal_id = ?")
            .bind(deal_id.0)
            .fetch_one(self.pool())
            .await?;

        row.try_get("total")
    }
}
