//! Order rows.

use crate::domain::{Decimal, NewOrder, Order, OrderFilter, OrderId, OrderStatus, TimeMs, UserId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{parsed, Repository};

const ORDER_COLUMNS: &str = r#"
    id, owner_id, side, token_kind, quantity, original_quantity, unit_price, min_fill,
    commission_rate, payment_info, status, created_at, updated_at, expires_at, completed_at
"#;

fn order_from_row(row: &SqliteRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: OrderId(row.try_get("id")?),
        owner: UserId::new(row.try_get("owner_id")?),
        side: parsed(row, "side")?,
        token_kind: parsed(row, "token_kind")?,
        quantity: parsed(row, "quantity")?,
        original_quantity: parsed(row, "original_quantity")?,
        unit_price: parsed(row, "unit_price")?,
        min_fill: parsed(row, "min_fill")?,
        commission_rate: parsed(row, "commission_rate")?,
        payment_info: row.try_get("payment_info")?,
        status: parsed(row, "status")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
        expires_at: TimeMs::new(row.try_get("expires_at")?),
        completed_at: row.try_get::<Option<i64>, _>("completed_at")?.map(TimeMs::new),
    })
}

/// Take the write lock on an order row. Returns false if the order does not exist.
pub async fn lock_order(conn: &mut SqliteConnection, id: OrderId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET version = version + 1 WHERE id = ?")
        .bind(id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_order(
    conn: &mut SqliteConnection,
    id: OrderId,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(order_from_row).transpose()
}

pub async fn insert_order(
    conn: &mut SqliteConnection,
    owner: UserId,
    new_order: &NewOrder,
    commission_rate: Decimal,
    now: TimeMs,
    expires_at: TimeMs,
) -> Result<OrderId, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (
            owner_id, side, token_kind, quantity, original_quantity, unit_price, min_fill,
            commission_rate, payment_info, status, created_at, updated_at, expires_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?, ?)
        "#,
    )
    .bind(owner.as_i64())
    .bind(new_order.side.as_str())
    .bind(new_order.token_kind.as_str())
    .bind(new_order.quantity.to_canonical_string())
    .bind(new_order.quantity.to_canonical_string())
    .bind(new_order.unit_price.to_canonical_string())
    .bind(new_order.min_fill.to_canonical_string())
    .bind(commission_rate.to_canonical_string())
    .bind(new_order.payment_info.as_str())
    .bind(now.as_ms())
    .bind(now.as_ms())
    .bind(expires_at.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(OrderId(result.last_insert_rowid()))
}

/// Persist the mutable part of an order: quantity, status and timestamps.
pub async fn store_order(conn: &mut SqliteConnection, order: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders
        SET quantity = ?, status = ?, updated_at = ?, expires_at = ?, completed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(order.quantity.to_canonical_string())
    .bind(order.status.as_str())
    .bind(order.updated_at.as_ms())
    .bind(order.expires_at.as_ms())
    .bind(order.completed_at.map(|t| t.as_ms()))
    .bind(order.id.0)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Repository {
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    /// Active, unexpired orders matching `filter`, newest first.
    ///
    /// Price bounds are applied after decoding because prices are stored as
    /// TEXT and SQLite would compare them lexically.
    pub async fn list_open_orders(
        &self,
        filter: &OrderFilter,
        now: TimeMs,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let mut sql = format!(
            "SELECT {} FROM orders WHERE status = 'active' AND expires_at > ?",
            ORDER_COLUMNS
        );
        if filter.side.is_some() {
            sql.push_str(" AND side = ?");
        }
        if filter.token_kind.is_some() {
            sql.push_str(" AND token_kind = ?");
        }
        if filter.exclude_owner.is_some() {
            sql.push_str(" AND owner_id <> ?");
        }
        sql.push_str(" ORDER BY id DESC");

        let mut query = sqlx::query(&sql).bind(now.as_ms());
        if let Some(side) = filter.side {
            query = query.bind(side.as_str());
        }
        if let Some(token) = filter.token_kind {
            query = query.bind(token.as_str());
        }
        if let Some(owner) = filter.exclude_owner {
            query = query.bind(owner.as_i64());
        }

        let rows = query.fetch_all(self.pool()).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let order = order_from_row(row)?;
            if filter.matches(&order) {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Every order posted by `owner`, newest first.
    pub async fn list_orders_by_owner(
        &self,
        owner: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM orders WHERE owner_id = ? AND status = ? ORDER BY id DESC",
                    ORDER_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(owner.as_i64())
                    .bind(status.as_str())
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM orders WHERE owner_id = ? ORDER BY id DESC",
                    ORDER_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(owner.as_i64())
                    .fetch_all(self.pool())
                    .await?
            }
        };

        rows.iter().map(order_from_row).collect()
    }

    /// Ids of active orders whose expiry has passed.
    pub async fn expired_order_ids(&self, now: TimeMs) -> Result<Vec<OrderId>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id FROM orders WHERE status = 'active' AND expires_at <= ? ORDER BY id ASC",
        )
        .bind(now.as_ms())
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| row.try_get("id").map(OrderId))
            .collect()
    }

    /// Every active order, for escrow accounting.
    pub async fn list_active_orders(&self) -> Result<Vec<Order>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM orders WHERE status = 'active' ORDER BY id ASC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        rows.iter().map(order_from_row).collect()
    }
}
