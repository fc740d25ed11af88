//! Deal rows.

use crate::domain::{Deal, DealId, DealStatus, Decimal, OrderId, Side, TimeMs, TokenKind, UserId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{parsed, Repository};

const DEAL_COLUMNS: &str = r#"
    id, order_id, order_side, buyer_id, seller_id, quantity, unit_price, token_kind,
    commission, status, created_at, updated_at
"#;

/// A deal about to be inserted; the database assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeal {
    pub order_id: OrderId,
    pub order_side: Side,
    pub buyer: UserId,
    pub seller: UserId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub token_kind: TokenKind,
    pub commission: Decimal,
}

fn deal_from_row(row: &SqliteRow) -> Result<Deal, sqlx::Error> {
    Ok(Deal {
        id: DealId(row.try_get("id")?),
        order_id: OrderId(row.try_get("order_id")?),
        order_side: parsed(row, "order_side")?,
        buyer: UserId::new(row.try_get("buyer_id")?),
        seller: UserId::new(row.try_get("seller_id")?),
        quantity: parsed(row, "quantity")?,
        unit_price: parsed(row, "unit_price")?,
        token_kind: parsed(row, "token_kind")?,
        commission: parsed(row, "commission")?,
        status: parsed(row, "status")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}

/// Take the write lock on a deal row. Returns false if the deal does not exist.
pub async fn lock_deal(conn: &mut SqliteConnection, id: DealId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE deals SET version = version + 1 WHERE id = ?")
        .bind(id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_deal(
    conn: &mut SqliteConnection,
    id: DealId,
) -> Result<Option<Deal>, sqlx::Error> {
    let sql = format!("SELECT {} FROM deals WHERE id = ?", DEAL_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(deal_from_row).transpose()
}

pub async fn insert_deal(
    conn: &mut SqliteConnection,
    deal: &NewDeal,
    now: TimeMs,
) -> Result<Deal, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO deals (
            order_id, order_side, buyer_id, seller_id, quantity, unit_price, token_kind,
            commission, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(deal.order_id.0)
    .bind(deal.order_side.as_str())
    .bind(deal.buyer.as_i64())
    .bind(deal.seller.as_i64())
    .bind(deal.quantity.to_canonical_string())
    .bind(deal.unit_price.to_canonical_string())
    .bind(deal.token_kind.as_str())
    .bind(deal.commission.to_canonical_string())
    .bind(now.as_ms())
    .bind(now.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(Deal {
        id: DealId(result.last_insert_rowid()),
        order_id: deal.order_id,
        order_side: deal.order_side,
        buyer: deal.buyer,
        seller: deal.seller,
        quantity: deal.quantity,
        unit_price: deal.unit_price,
        token_kind: deal.token_kind,
        commission: deal.commission,
        status: DealStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

pub async fn store_deal_status(
    conn: &mut SqliteConnection,
    id: DealId,
    status: DealStatus,
    now: TimeMs,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE deals SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now.as_ms())
        .bind(id.0)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

impl Repository {
    pub async fn get_deal(&self, id: DealId) -> Result<Option<Deal>, sqlx::Error> {
        let sql = format!("SELECT {} FROM deals WHERE id = ?", DEAL_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(deal_from_row).transpose()
    }

    /// Deals where `user` is buyer or seller, newest first.
    pub async fn list_deals_for(
        &self,
        user: UserId,
        status: Option<DealStatus>,
    ) -> Result<Vec<Deal>, sqlx::Error> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM deals WHERE (buyer_id = ? OR seller_id = ?) AND status = ? ORDER BY id DESC",
                    DEAL_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(user.as_i64())
                    .bind(user.as_i64())
                    .bind(status.as_str())
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM deals WHERE buyer_id = ? OR seller_id = ? ORDER BY id DESC",
                    DEAL_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(user.as_i64())
                    .bind(user.as_i64())
                    .fetch_all(self.pool())
                    .await?
            }
        };

        rows.iter().map(deal_from_row).collect()
    }

    /// Every deal in `status`, oldest first.
    pub async fn list_deals_with_status(&self, status: DealStatus) -> Result<Vec<Deal>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM deals WHERE status = ? ORDER BY id ASC",
            DEAL_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(deal_from_row).collect()
    }
}
