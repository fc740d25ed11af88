//! Deal settlement state machine.
//!
//! ```text
//! pending --confirm_payment (buyer)--> paid --confirm_receipt (seller)--> completed
//!    |                                   |
//!    +------------- cancel --------------+--> cancelled
//! ```
//!
//! While a deal is open both sides' funds sit in escrow: the taker's from
//! accepting, the maker's carved out of the order. Completion pays each side
//! out; cancellation refunds the taker and hands the maker's share back to
//! the order, or to the maker when the order is already closed.

use super::order_book::lock_order_for_update;
use super::{finish_unit, Exchange, ExchangeError};
use crate::config::CancelPolicy;
use crate::db::repo::{deals, orders};
use crate::domain::{Deal, DealId, DealStatus, EntryReason, EntryRef, OrderStatus, UserId};
use crate::ledger::credit_in;
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info};

async fn lock_deal_for_update(
    conn: &mut SqliteConnection,
    id: DealId,
) -> Result<Deal, ExchangeError> {
    if !deals::lock_deal(conn, id).await? {
        return Err(ExchangeError::NotFound(format!("transaction {}", id)));
    }
    deals::fetch_deal(conn, id)
        .await?
        .ok_or_else(|| ExchangeError::NotFound(format!("transaction {}", id)))
}

fn require_transition(deal: &Deal, next: DealStatus) -> Result<(), ExchangeError> {
    if deal.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(ExchangeError::InvalidState(format!(
            "transaction {} is {}, cannot become {}",
            deal.id, deal.status, next
        )))
    }
}

impl Exchange {
    /// Buyer reports the off-platform payment as sent. No funds move.
    pub async fn confirm_payment(
        &self,
        deal_id: DealId,
        requester: UserId,
    ) -> Result<Deal, ExchangeError> {
        let now = self.clock.now();

        let deal = finish_unit(
            "confirm_payment",
            async {
                let mut tx = self.repo.begin().await?;
                let mut deal = lock_deal_for_update(&mut tx, deal_id).await?;
                if requester != deal.buyer {
                    return Err(ExchangeError::Forbidden(
                        "only the buyer may confirm payment".to_string(),
                    ));
                }
                require_transition(&deal, DealStatus::Paid)?;

                deals::store_deal_status(&mut tx, deal.id, DealStatus::Paid, now).await?;
                tx.commit().await?;
                deal.status = DealStatus::Paid;
                deal.updated_at = now;
                Ok::<_, ExchangeError>(deal)
            }
            .await,
        )?;

        info!(transaction_id = %deal.id, user_id = %requester, "Payment confirmed");
        Ok(deal)
    }

    /// Seller confirms receipt; both escrows pay out and the deal completes.
    pub async fn confirm_receipt(
        &self,
        deal_id: DealId,
        requester: UserId,
    ) -> Result<Deal, ExchangeError> {
        let now = self.clock.now();
        let platform = self.settings.platform_account;

        let deal = finish_unit(
            "confirm_receipt",
            async {
                let mut tx = self.repo.begin().await?;
                let mut deal = lock_deal_for_update(&mut tx, deal_id).await?;
                if requester != deal.seller {
                    return Err(ExchangeError::Forbidden(
                        "only the seller may confirm receipt".to_string(),
                    ));
                }
                require_transition(&deal, DealStatus::Completed)?;

                let reference = EntryRef::deal(deal.order_id, deal.id);
                credit_in(
                    &mut tx,
                    deal.seller,
                    deal.payment_token(),
                    deal.consideration(),
                    EntryReason::Settlement,
                    reference,
                    now,
                )
                .await?;
                credit_in(
                    &mut tx,
                    deal.buyer,
                    deal.token_kind,
                    deal.quantity,
                    EntryReason::Settlement,
                    reference,
                    now,
                )
                .await?;
                if let Some(platform) = platform {
                    if deal.commission.is_positive() {
                        credit_in(
                            &mut tx,
                            platform,
                            deal.payment_token(),
                            deal.commission,
                            EntryReason::Commission,
                            reference,
                            now,
                        )
                        .await?;
                    }
                }

                deals::store_deal_status(&mut tx, deal.id, DealStatus::Completed, now).await?;
                tx.commit().await?;
                deal.status = DealStatus::Completed;
                deal.updated_at = now;
                Ok::<_, ExchangeError>(deal)
            }
            .await,
        )?;

        info!(
            transaction_id = %deal.id,
            seller = %deal.seller,
            buyer = %deal.buyer,
            consideration = %deal.consideration(),
            quantity = %deal.quantity,
            commission = %deal.commission,
            commission_to_platform = platform.is_some(),
            "Transaction completed"
        );
        Ok(deal)
    }

    /// Cancel an open deal and unwind its escrow.
    pub async fn cancel_deal(
        &self,
        deal_id: DealId,
        requester: UserId,
    ) -> Result<Deal, ExchangeError> {
        let now = self.clock.now();
        let policy = self.settings.cancel_policy;

        let (deal, reopened) = finish_unit(
            "cancel_deal",
            async {
                let mut tx = self.repo.begin().await?;
                let mut deal = lock_deal_for_update(&mut tx, deal_id).await?;
                if !deal.is_participant(requester) {
                    return Err(ExchangeError::Forbidden(
                        "not a participant of this transaction".to_string(),
                    ));
                }
                require_transition(&deal, DealStatus::Cancelled)?;
                if policy == CancelPolicy::SellerAfterPayment
                    && deal.status == DealStatus::Paid
                    && requester != deal.seller
                {
                    return Err(ExchangeError::Forbidden(
                        "only the seller may cancel once payment is confirmed".to_string(),
                    ));
                }

                let reference = EntryRef::deal(deal.order_id, deal.id);
                let (taker_token, taker_amount) = deal.taker_escrow();
                credit_in(
                    &mut tx,
                    deal.taker(),
                    taker_token,
                    taker_amount,
                    EntryReason::FillRefund,
                    reference,
                    now,
                )
                .await?;

                let mut order = lock_order_for_update(&mut tx, deal.order_id).await?;
                let reopened = if order.status.is_closed() {
                    let (maker_token, maker_amount) = deal.maker_escrow();
                    credit_in(
                        &mut tx,
                        deal.maker(),
                        maker_token,
                        maker_amount,
                        EntryReason::FillRefund,
                        reference,
                        now,
                    )
                    .await?;
                    false
                } else {
                    order.quantity = order.quantity + deal.quantity;
                    if order.status == OrderStatus::Completed {
                        order.status = OrderStatus::Active;
                        order.completed_at = None;
                    }
                    order.updated_at = now;
                    orders::store_order(&mut tx, &order).await?;
                    true
                };

                deals::store_deal_status(&mut tx, deal.id, DealStatus::Cancelled, now).await?;
                tx.commit().await?;
                deal.status = DealStatus::Cancelled;
                deal.updated_at = now;
                Ok::<_, ExchangeError>((deal, reopened))
            }
            .await,
        )?;

        info!(
            transaction_id = %deal.id,
            order_id = %deal.order_id,
            user_id = %requester,
            quantity = %deal.quantity,
            returned_to_order = reopened,
            "Transaction cancelled"
        );
        Ok(deal)
    }

    /// A deal as seen by one of its participants.
    pub async fn get_transaction(
        &self,
        deal_id: DealId,
        requester: UserId,
    ) -> Result<Deal, ExchangeError> {
        let deal = self.participant_deal(deal_id, requester).await?;
        debug!(transaction_id = %deal.id, user_id = %requester, "Loaded transaction");
        Ok(deal)
    }

    pub async fn list_transactions(
        &self,
        user: UserId,
        status: Option<DealStatus>,
    ) -> Result<Vec<Deal>, ExchangeError> {
        Ok(self.repo.list_deals_for(user, status).await?)
    }

    /// Load a deal, failing unless `requester` takes part in it.
    pub(super) async fn participant_deal(
        &self,
        deal_id: DealId,
        requester: UserId,
    ) -> Result<Deal, ExchangeError> {
        let deal = self
            .repo
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| ExchangeError::NotFound(format!("transaction {}", deal_id)))?;
        if !deal.is_participant(requester) {
            return Err(ExchangeError::Forbidden(
                "not a participant of this transaction".to_string(),
            ));
        }
        Ok(deal)
    }
}
