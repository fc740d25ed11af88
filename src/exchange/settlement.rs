//! Matching: a counter-party accepts all or part of an order.

use super::order_book::{check_scale, close_order, lock_order_for_update};
use super::{finish_unit, Exchange, ExchangeError};
use crate::db::repo::deals::{self, NewDeal};
use crate::db::repo::orders;
use crate::domain::{
    Deal, Decimal, EntryReason, EntryRef, Order, OrderId, OrderStatus, Side, TimeMs, UserId,
};
use crate::ledger::debit_in;
use tracing::info;

fn validate_fill(order: &Order, fill: Decimal) -> Result<(), ExchangeError> {
    if !fill.is_positive() {
        return Err(ExchangeError::InvalidQuantity(
            "fill quantity must be positive".to_string(),
        ));
    }
    check_scale(
        fill,
        order.token_kind.scale(),
        "fill quantity",
        ExchangeError::InvalidQuantity,
    )?;
    if fill > order.quantity {
        return Err(ExchangeError::InvalidQuantity(format!(
            "fill {} exceeds the remaining {}",
            fill, order.quantity
        )));
    }
    if fill < order.minimum_fill_quantity() && fill != order.quantity {
        return Err(ExchangeError::InvalidQuantity(format!(
            "fill {} is below the minimum {}",
            fill,
            order.minimum_fill_quantity()
        )));
    }
    Ok(())
}

impl Exchange {
    /// Accept `fill` units of an order, escrowing the counter-party's side and
    /// opening a pending deal.
    pub async fn accept_order(
        &self,
        order_id: OrderId,
        counterparty: UserId,
        fill: Decimal,
    ) -> Result<Deal, ExchangeError> {
        let now = self.clock.now();

        // `None` means the order had run out its time and was expired in this unit.
        let outcome = finish_unit(
            "accept_order",
            async {
                let mut tx = self.repo.begin().await?;
                let mut order = lock_order_for_update(&mut tx, order_id).await?;

                if order.status != OrderStatus::Active {
                    return Err(ExchangeError::InvalidState(format!(
                        "order {} is {}",
                        order.id, order.status
                    )));
                }
                if order.is_expired_at(now) {
                    close_order(&mut tx, &mut order, OrderStatus::Expired, now).await?;
                    tx.commit().await?;
                    return Ok(None);
                }
                if counterparty == order.owner {
                    return Err(ExchangeError::SelfTrade);
                }
                validate_fill(&order, fill)?;

                let deal = self.open_deal(&mut tx, &mut order, counterparty, fill, now).await?;
                tx.commit().await?;
                Ok::<_, ExchangeError>(Some((deal, order)))
            }
            .await,
        )?;

        match outcome {
            Some((deal, order)) => {
                info!(
                    transaction_id = %deal.id,
                    order_id = %order.id,
                    buyer = %deal.buyer,
                    seller = %deal.seller,
                    quantity = %deal.quantity,
                    commission = %deal.commission,
                    remaining = %order.quantity,
                    order_status = %order.status,
                    "Order accepted"
                );
                Ok(deal)
            }
            None => {
                info!(order_id = %order_id, "Order expired on accept");
                Err(ExchangeError::InvalidState(format!(
                    "order {} has expired",
                    order_id
                )))
            }
        }
    }

    /// Escrow the counter-party, decrement the order and insert the deal.
    async fn open_deal(
        &self,
        conn: &mut sqlx::sqlite::SqliteConnection,
        order: &mut Order,
        counterparty: UserId,
        fill: Decimal,
        now: TimeMs,
    ) -> Result<Deal, ExchangeError> {
        let (buyer, seller) = match order.side {
            Side::Sell => (counterparty, order.owner),
            Side::Buy => (order.owner, counterparty),
        };

        let deal = deals::insert_deal(
            conn,
            &NewDeal {
                order_id: order.id,
                order_side: order.side,
                buyer,
                seller,
                quantity: fill,
                unit_price: order.unit_price,
                token_kind: order.token_kind,
                commission: order.commission_for(fill),
            },
            now,
        )
        .await?;

        let (escrow_token, escrow_amount) = deal.taker_escrow();
        debit_in(
            conn,
            counterparty,
            escrow_token,
            escrow_amount,
            EntryReason::FillEscrow,
            EntryRef::deal(order.id, deal.id),
            now,
        )
        .await?;

        order.quantity = order.quantity - fill;
        if order.quantity.is_zero() {
            order.status = OrderStatus::Completed;
            order.completed_at = Some(now);
        }
        order.updated_at = now;
        orders::store_order(conn, order).await?;

        Ok(deal)
    }
}
