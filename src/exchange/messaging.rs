//! Deal chat between the two participants.

use super::{Exchange, ExchangeError};
use crate::domain::{DealId, Message, UserId};
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info};

impl Exchange {
    /// Append a message to a deal's chat. Content is stored trimmed.
    pub async fn post_message(
        &self,
        deal_id: DealId,
        sender: UserId,
        content: &str,
    ) -> Result<Message, ExchangeError> {
        let deal = self.participant_deal(deal_id, sender).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ExchangeError::EmptyContent);
        }
        let chars = content.chars().count();
        if chars > self.settings.max_message_chars {
            return Err(ExchangeError::InvalidInput(format!(
                "message is {} characters, limit is {}",
                chars, self.settings.max_message_chars
            )));
        }

        let now = self.clock.now();
        let message = self
            .repo
            .insert_message(deal.id, sender, content, now)
            .await?;

        info!(
            transaction_id = %deal.id,
            message_id = message.id.0,
            sender = %sender,
            chars,
            "Message posted"
        );
        Ok(message)
    }

    /// Messages of a deal, oldest first, decoded as they are read.
    pub async fn list_messages(
        &self,
        deal_id: DealId,
        requester: UserId,
    ) -> Result<BoxStream<'_, Result<Message, ExchangeError>>, ExchangeError> {
        let deal = self.participant_deal(deal_id, requester).await?;
        debug!(transaction_id = %deal.id, user_id = %requester, "Streaming messages");

        Ok(self
            .repo
            .stream_messages(deal.id)
            .map(|row| row.map_err(ExchangeError::from))
            .boxed())
    }

    /// Mark everything the other participant sent as read. Returns how many changed.
    pub async fn mark_read(&self, deal_id: DealId, requester: UserId) -> Result<u64, ExchangeError> {
        let deal = self.participant_deal(deal_id, requester).await?;
        let Some(other) = deal.counterpart_of(requester) else {
            return Err(ExchangeError::Forbidden(
                "not a participant of this transaction".to_string(),
            ));
        };

        let marked = self.repo.mark_read_from(deal.id, other).await?;
        debug!(transaction_id = %deal.id, user_id = %requester, marked, "Marked messages read");
        Ok(marked)
    }

    pub async fn unread_count(&self, deal_id: DealId, requester: UserId) -> Result<i64, ExchangeError> {
        let deal = self.participant_deal(deal_id, requester).await?;
        let Some(other) = deal.counterpart_of(requester) else {
            return Err(ExchangeError::Forbidden(
                "not a participant of this transaction".to_string(),
            ));
        };

        Ok(self.repo.unread_count_from(deal.id, other).await?)
    }
}
