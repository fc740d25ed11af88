//! Order book: posting, listing, cancelling, extending and expiring orders.
//!
//! An active order always holds escrow for its remaining quantity: the token
//! itself for sell orders, consideration plus commission in the counter-token
//! for buy orders. Closing an order (cancel or expiry) hands that escrow back.

use super::{finish_unit, Exchange, ExchangeError};
use crate::db::repo::orders;
use crate::domain::{
    Decimal, EntryReason, EntryRef, NewOrder, Order, OrderFilter, OrderId, OrderStatus, Side,
    TimeMs, TokenKind, UserId,
};
use crate::ledger::{credit_in, debit_in};
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info, warn};

/// Highest number of fractional digits accepted for a unit price.
pub const PRICE_SCALE: u32 = 8;

/// Lock an order row and load it.
pub(super) async fn lock_order_for_update(
    conn: &mut SqliteConnection,
    id: OrderId,
) -> Result<Order, ExchangeError> {
    if !orders::lock_order(conn, id).await? {
        return Err(ExchangeError::NotFound(format!("order {}", id)));
    }
    orders::fetch_order(conn, id)
        .await?
        .ok_or_else(|| ExchangeError::NotFound(format!("order {}", id)))
}

/// Release the remaining escrow to the owner and move the order to `status`.
pub(super) async fn close_order(
    conn: &mut SqliteConnection,
    order: &mut Order,
    status: OrderStatus,
    now: TimeMs,
) -> Result<(), ExchangeError> {
    let (token, amount) = order.escrow_for(order.quantity);
    if amount.is_positive() {
        credit_in(
            conn,
            order.owner,
            token,
            amount,
            EntryReason::OrderRelease,
            EntryRef::order(order.id),
            now,
        )
        .await?;
    }
    order.status = status;
    order.updated_at = now;
    orders::store_order(conn, order).await?;
    Ok(())
}

pub(super) fn check_scale(
    value: Decimal,
    scale: u32,
    field: &str,
    err: fn(String) -> ExchangeError,
) -> Result<(), ExchangeError> {
    if value.fractional_digits() > scale {
        return Err(err(format!(
            "{} {} has more than {} fractional digits",
            field, value, scale
        )));
    }
    Ok(())
}

impl Exchange {
    fn validate_new_order(&self, mut new_order: NewOrder) -> Result<NewOrder, ExchangeError> {
        let scale = new_order.token_kind.scale();

        if !new_order.quantity.is_positive() {
            return Err(ExchangeError::InvalidQuantity(
                "quantity must be positive".to_string(),
            ));
        }
        check_scale(new_order.quantity, scale, "quantity", ExchangeError::InvalidQuantity)?;

        if !new_order.unit_price.is_positive() {
            return Err(ExchangeError::InvalidInput(
                "unit price must be positive".to_string(),
            ));
        }
        check_scale(new_order.unit_price, PRICE_SCALE, "unit price", ExchangeError::InvalidInput)?;

        if !new_order.min_fill.is_positive() || new_order.min_fill > new_order.quantity {
            return Err(ExchangeError::InvalidQuantity(format!(
                "minimum fill {} must be positive and at most the quantity {}",
                new_order.min_fill, new_order.quantity
            )));
        }
        check_scale(new_order.min_fill, scale, "minimum fill", ExchangeError::InvalidQuantity)?;

        new_order.payment_info = new_order.payment_info.trim().to_string();
        let info_chars = new_order.payment_info.chars().count();
        if info_chars > self.settings.max_payment_info_chars {
            return Err(ExchangeError::InvalidInput(format!(
                "payment info is {} characters, limit is {}",
                info_chars, self.settings.max_payment_info_chars
            )));
        }

        Ok(new_order)
    }

    /// What posting `new_order` locks from its owner.
    ///
    /// The full notional including commission is computed with checked
    /// arithmetic here so every later fill of the order stays in range.
    fn creation_escrow(&self, new_order: &NewOrder) -> Result<(TokenKind, Decimal), ExchangeError> {
        let overflow = || ExchangeError::InvalidInput("order notional is out of range".to_string());
        let notional = new_order
            .quantity
            .checked_mul(new_order.unit_price)
            .ok_or_else(overflow)?;
        let commission = notional
            .checked_mul(self.settings.commission_rate)
            .ok_or_else(overflow)?;
        let with_commission = notional.checked_add(commission).ok_or_else(overflow)?;

        Ok(match new_order.side {
            Side::Sell => (new_order.token_kind, new_order.quantity),
            Side::Buy => (new_order.token_kind.counter_token(), with_commission),
        })
    }

    /// Post an order and lock its escrow.
    pub async fn create_order(
        &self,
        owner: UserId,
        new_order: NewOrder,
    ) -> Result<Order, ExchangeError> {
        let new_order = self.validate_new_order(new_order)?;
        let (escrow_token, escrow_amount) = self.creation_escrow(&new_order)?;
        let now = self.clock.now();
        let expires_at = now.plus_ms(self.settings.order_expiry_ms);

        let order = finish_unit(
            "create_order",
            async {
                let mut tx = self.repo.begin().await?;
                let id = orders::insert_order(
                    &mut tx,
                    owner,
                    &new_order,
                    self.settings.commission_rate,
                    now,
                    expires_at,
                )
                .await?;
                debit_in(
                    &mut tx,
                    owner,
                    escrow_token,
                    escrow_amount,
                    EntryReason::OrderEscrow,
                    EntryRef::order(id),
                    now,
                )
                .await?;
                let order = orders::fetch_order(&mut tx, id)
                    .await?
                    .ok_or_else(|| ExchangeError::NotFound(format!("order {}", id)))?;
                tx.commit().await?;
                Ok::<_, ExchangeError>(order)
            }
            .await,
        )?;

        info!(
            order_id = %order.id,
            user_id = %owner,
            side = %order.side,
            token = %order.token_kind,
            quantity = %order.quantity,
            unit_price = %order.unit_price,
            escrow_token = %escrow_token,
            escrow = %escrow_amount,
            "Order created"
        );
        Ok(order)
    }

    /// Cancel an active order and return its remaining escrow to the owner.
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Order, ExchangeError> {
        let now = self.clock.now();

        let order = finish_unit(
            "cancel_order",
            async {
                let mut tx = self.repo.begin().await?;
                let mut order = lock_order_for_update(&mut tx, order_id).await?;
                if order.owner != requester {
                    return Err(ExchangeError::NotOwner);
                }
                if order.status != OrderStatus::Active {
                    return Err(ExchangeError::InvalidState(format!(
                        "order {} is {}",
                        order.id, order.status
                    )));
                }
                close_order(&mut tx, &mut order, OrderStatus::Cancelled, now).await?;
                tx.commit().await?;
                Ok::<_, ExchangeError>(order)
            }
            .await,
        )?;

        info!(order_id = %order.id, user_id = %requester, released = %order.quantity, "Order cancelled");
        Ok(order)
    }

    /// Push an active order's expiry out to a full horizon from now.
    pub async fn extend_order(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Order, ExchangeError> {
        let now = self.clock.now();

        let order = finish_unit(
            "extend_order",
            async {
                let mut tx = self.repo.begin().await?;
                let mut order = lock_order_for_update(&mut tx, order_id).await?;
                if order.owner != requester {
                    return Err(ExchangeError::NotOwner);
                }
                if order.status != OrderStatus::Active || order.is_expired_at(now) {
                    return Err(ExchangeError::InvalidState(format!(
                        "order {} is no longer open",
                        order.id
                    )));
                }
                order.expires_at = now.plus_ms(self.settings.order_expiry_ms);
                order.updated_at = now;
                orders::store_order(&mut tx, &order).await?;
                tx.commit().await?;
                Ok::<_, ExchangeError>(order)
            }
            .await,
        )?;

        info!(order_id = %order.id, expires_at = %order.expires_at.to_rfc3339(), "Order extended");
        Ok(order)
    }

    /// Bring a cancelled or expired order back to active, locking its
    /// remaining escrow again and starting a fresh expiry horizon.
    pub async fn reactivate_order(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Order, ExchangeError> {
        let now = self.clock.now();

        let (order, escrow_token, escrow_amount) = finish_unit(
            "reactivate_order",
            async {
                let mut tx = self.repo.begin().await?;
                let mut order = lock_order_for_update(&mut tx, order_id).await?;
                if order.owner != requester {
                    return Err(ExchangeError::NotOwner);
                }
                if !order.status.is_closed() || !order.quantity.is_positive() {
                    return Err(ExchangeError::InvalidState(format!(
                        "order {} is {} and cannot be reactivated",
                        order.id, order.status
                    )));
                }

                let (token, amount) = order.escrow_for(order.quantity);
                debit_in(
                    &mut tx,
                    order.owner,
                    token,
                    amount,
                    EntryReason::OrderEscrow,
                    EntryRef::order(order.id),
                    now,
                )
                .await?;
                order.status = OrderStatus::Active;
                order.expires_at = now.plus_ms(self.settings.order_expiry_ms);
                order.updated_at = now;
                orders::store_order(&mut tx, &order).await?;
                tx.commit().await?;
                Ok::<_, ExchangeError>((order, token, amount))
            }
            .await,
        )?;

        info!(
            order_id = %order.id,
            user_id = %requester,
            escrow_token = %escrow_token,
            escrow = %escrow_amount,
            "Order reactivated"
        );
        Ok(order)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ExchangeError> {
        self.repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| ExchangeError::NotFound(format!("order {}", order_id)))
    }

    /// Orders that can still be accepted, newest first. Expired orders are swept first.
    pub async fn list_active_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ExchangeError> {
        if let Err(err) = self.sweep_expired().await {
            warn!(error = %err, "Expiry sweep before listing failed");
        }
        let now = self.clock.now();
        let orders = self.repo.list_open_orders(filter, now).await?;
        debug!(count = orders.len(), "Listed active orders");
        Ok(orders)
    }

    pub async fn list_own_orders(
        &self,
        owner: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, ExchangeError> {
        Ok(self.repo.list_orders_by_owner(owner, status).await?)
    }

    /// Expire every active order past its expiry and release its escrow.
    ///
    /// Each order is handled in its own unit, so a failure leaves the orders
    /// already processed expired. Returns how many orders this call expired.
    pub async fn sweep_expired(&self) -> Result<usize, ExchangeError> {
        let now = self.clock.now();
        let candidates = self.repo.expired_order_ids(now).await?;

        let mut expired = 0;
        for order_id in candidates {
            if self.expire_order(order_id, now).await? {
                expired += 1;
            }
        }

        if expired > 0 {
            info!(expired, "Expired orders swept");
        }
        Ok(expired)
    }

    /// Returns false when the order was already closed or extended by someone else.
    async fn expire_order(&self, order_id: OrderId, now: TimeMs) -> Result<bool, ExchangeError> {
        let expired = finish_unit(
            "expire_order",
            async {
                let mut tx = self.repo.begin().await?;
                let mut order = lock_order_for_update(&mut tx, order_id).await?;
                if order.status != OrderStatus::Active || !order.is_expired_at(now) {
                    return Ok(false);
                }
                close_order(&mut tx, &mut order, OrderStatus::Expired, now).await?;
                tx.commit().await?;
                Ok::<_, ExchangeError>(true)
            }
            .await,
        )?;

        if expired {
            info!(order_id = %order_id, "Order expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::exchange::test_support::*;

    const SELLER: UserId = UserId(1);
    const BUYER: UserId = UserId(2);

    #[tokio::test]
    async fn test_sell_order_escrows_token() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "150").await;

        let order = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "100", "10", "50"))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.quantity, d("100"));
        assert_eq!(order.original_quantity, d("100"));
        assert_eq!(order.commission_rate, d("0.03"));
        assert_eq!(order.expires_at, TimeMs::new(START_MS).plus_ms(259_200_000));
        assert_eq!(balance(&exchange, SELLER, TokenKind::Not).await, d("50"));
    }

    #[tokio::test]
    async fn test_buy_order_escrows_counter_token_with_commission() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, BUYER, TokenKind::Cf, "1000").await;

        exchange
            .create_order(BUYER, new_order(Side::Buy, TokenKind::Not, "100", "5", "10"))
            .await
            .unwrap();

        assert_eq!(balance(&exchange, BUYER, TokenKind::Cf).await, d("485"));
    }

    #[tokio::test]
    async fn test_create_without_funds_creates_nothing() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Ton, "1").await;

        let err = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Ton, "2", "3", "1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "insufficient_funds");
        assert!(exchange.list_own_orders(SELLER, None).await.unwrap().is_empty());
        assert_eq!(balance(&exchange, SELLER, TokenKind::Ton).await, d("1"));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Cf, "1000").await;

        let cases = [
            (new_order(Side::Sell, TokenKind::Cf, "0", "1", "1"), "invalid_quantity"),
            (new_order(Side::Sell, TokenKind::Cf, "10", "0", "1"), "invalid_input"),
            (new_order(Side::Sell, TokenKind::Cf, "10", "1", "11"), "invalid_quantity"),
            (new_order(Side::Sell, TokenKind::Cf, "10", "1", "0"), "invalid_quantity"),
            (new_order(Side::Sell, TokenKind::Cf, "10.001", "1", "1"), "invalid_quantity"),
            (new_order(Side::Sell, TokenKind::Cf, "10", "0.000000001", "1"), "invalid_input"),
        ];
        for (input, kind) in cases {
            let err = exchange.create_order(SELLER, input).await.unwrap_err();
            assert_eq!(err.kind(), kind);
        }

        let mut long_info = new_order(Side::Sell, TokenKind::Cf, "10", "1", "1");
        long_info.payment_info = "x".repeat(1001);
        let err = exchange.create_order(SELLER, long_info).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        assert_eq!(balance(&exchange, SELLER, TokenKind::Cf).await, d("1000"));
    }

    #[tokio::test]
    async fn test_ton_accepts_eight_fractional_digits() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Ton, "1").await;

        let order = exchange
            .create_order(
                SELLER,
                new_order(Side::Sell, TokenKind::Ton, "0.12345678", "2.5", "0.1"),
            )
            .await
            .unwrap();
        assert_eq!(order.quantity, d("0.12345678"));
    }

    #[tokio::test]
    async fn test_cancel_releases_escrow() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, BUYER, TokenKind::Cf, "515").await;
        let order = exchange
            .create_order(BUYER, new_order(Side::Buy, TokenKind::Not, "100", "5", "10"))
            .await
            .unwrap();
        assert_eq!(balance(&exchange, BUYER, TokenKind::Cf).await, d("0"));

        let err = exchange.cancel_order(order.id, SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "not_owner");

        let cancelled = exchange.cancel_order(order.id, BUYER).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(balance(&exchange, BUYER, TokenKind::Cf).await, d("515"));

        let err = exchange.cancel_order(order.id, BUYER).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(balance(&exchange, BUYER, TokenKind::Cf).await, d("515"));
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        let err = exchange.cancel_order(OrderId(99), SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_list_active_filters_and_orders_newest_first() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "100").await;
        fund(&exchange, BUYER, TokenKind::Cf, "1000").await;

        let cheap = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "2", "1"))
            .await
            .unwrap();
        let dear = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "20", "1"))
            .await
            .unwrap();
        let bid = exchange
            .create_order(BUYER, new_order(Side::Buy, TokenKind::Not, "10", "3", "1"))
            .await
            .unwrap();

        let all = exchange.list_active_orders(&OrderFilter::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![bid.id, dear.id, cheap.id]);

        let sells_under_ten = exchange
            .list_active_orders(&OrderFilter {
                side: Some(Side::Sell),
                max_price: Some(d("10")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sells_under_ten.len(), 1);
        assert_eq!(sells_under_ten[0].id, cheap.id);

        let not_mine = exchange
            .list_active_orders(&OrderFilter {
                exclude_owner: Some(SELLER),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(not_mine.len(), 1);
        assert_eq!(not_mine[0].id, bid.id);
    }

    #[tokio::test]
    async fn test_sweep_expires_and_releases_once() {
        let (exchange, clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "100").await;
        let order = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "100", "1", "1"))
            .await
            .unwrap();

        clock.advance(259_200_000 - 1);
        assert_eq!(exchange.sweep_expired().await.unwrap(), 0);

        clock.advance(1);
        assert_eq!(exchange.sweep_expired().await.unwrap(), 1);
        assert_eq!(exchange.sweep_expired().await.unwrap(), 0);

        let order = exchange.get_order(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Expired);
        assert_eq!(balance(&exchange, SELLER, TokenKind::Not).await, d("100"));
        assert!(exchange
            .list_active_orders(&OrderFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_extend_resets_horizon() {
        let (exchange, clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "10").await;
        let order = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "1", "1"))
            .await
            .unwrap();

        clock.advance(1_000_000);
        let extended = exchange.extend_order(order.id, SELLER).await.unwrap();
        assert_eq!(extended.expires_at, clock.now().plus_ms(259_200_000));

        let err = exchange.extend_order(order.id, BUYER).await.unwrap_err();
        assert_eq!(err.kind(), "not_owner");

        clock.advance(259_200_000);
        let err = exchange.extend_order(order.id, SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_reactivate_cancelled_order_locks_escrow_again() {
        let (exchange, clock, _temp) = setup_exchange().await;
        fund(&exchange, BUYER, TokenKind::Cf, "515").await;
        let order = exchange
            .create_order(BUYER, new_order(Side::Buy, TokenKind::Not, "100", "5", "10"))
            .await
            .unwrap();
        exchange.cancel_order(order.id, BUYER).await.unwrap();
        assert_eq!(balance(&exchange, BUYER, TokenKind::Cf).await, d("515"));

        let err = exchange.reactivate_order(order.id, SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "not_owner");

        clock.advance(5_000);
        let active = exchange.reactivate_order(order.id, BUYER).await.unwrap();
        assert_eq!(active.status, OrderStatus::Active);
        assert_eq!(active.quantity, d("100"));
        assert_eq!(active.expires_at, clock.now().plus_ms(259_200_000));
        assert_eq!(balance(&exchange, BUYER, TokenKind::Cf).await, d("0"));

        let listed = exchange.list_active_orders(&OrderFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);

        let err = exchange.reactivate_order(order.id, BUYER).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn test_reactivate_expired_order_without_funds_changes_nothing() {
        let (exchange, clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "100").await;
        let order = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "100", "1", "1"))
            .await
            .unwrap();
        clock.advance(259_200_000);
        assert_eq!(exchange.sweep_expired().await.unwrap(), 1);

        exchange
            .ledger()
            .debit(SELLER, TokenKind::Not, d("30"))
            .await
            .unwrap();

        let err = exchange.reactivate_order(order.id, SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "insufficient_funds");
        assert_eq!(balance(&exchange, SELLER, TokenKind::Not).await, d("70"));

        let unchanged = exchange.get_order(order.id).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::Expired);
        assert_eq!(unchanged.expires_at, order.expires_at);
    }

    #[tokio::test]
    async fn test_reactivate_rejects_completed_and_active_orders() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "20").await;
        fund(&exchange, BUYER, TokenKind::Cf, "100").await;
        let filled = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "1", "1"))
            .await
            .unwrap();
        exchange.accept_order(filled.id, BUYER, d("10")).await.unwrap();
        let open = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "1", "1"))
            .await
            .unwrap();

        let err = exchange.reactivate_order(filled.id, SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(
            exchange.get_order(filled.id).await.unwrap().status,
            OrderStatus::Completed
        );

        let err = exchange.reactivate_order(open.id, SELLER).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(balance(&exchange, SELLER, TokenKind::Not).await, d("0"));
    }

    #[tokio::test]
    async fn test_list_own_orders_by_status() {
        let (exchange, _clock, _temp) = setup_exchange().await;
        fund(&exchange, SELLER, TokenKind::Not, "20").await;
        let first = exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "1", "1"))
            .await
            .unwrap();
        exchange
            .create_order(SELLER, new_order(Side::Sell, TokenKind::Not, "10", "1", "1"))
            .await
            .unwrap();
        exchange.cancel_order(first.id, SELLER).await.unwrap();

        assert_eq!(exchange.list_own_orders(SELLER, None).await.unwrap().len(), 2);
        let cancelled = exchange
            .list_own_orders(SELLER, Some(OrderStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.id);
    }
}
