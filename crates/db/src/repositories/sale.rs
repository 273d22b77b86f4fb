use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use tendero_core::domain::product::ProductId;
use tendero_core::domain::sale::SaleId;

use super::{
    decimal_column, RegisterSaleError, RepositoryError, SaleReceipt, SaleRepository, TopSeller,
};
use crate::DbPool;

pub struct SqlSaleRepository {
    pool: DbPool,
}

impl SqlSaleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn try_register(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Attempt, RegisterSaleError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT name, sale_price, cost_price, current_stock FROM products WHERE id = ?1",
        )
        .bind(product_id.0)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RegisterSaleError::ProductNotFound(product_id))?;

        let product_name: String = row.try_get("name").map_err(RepositoryError::from)?;
        let sale_price = decimal_column(&row, "sale_price")?;
        let cost_price = decimal_column(&row, "cost_price")?;
        let current_stock: i64 = row.try_get("current_stock").map_err(RepositoryError::from)?;

        if current_stock < quantity {
            return Err(RegisterSaleError::InsufficientStock { available: current_stock });
        }

        // The decrement carries its own sufficiency guard: zero rows affected
        // means a concurrent sale consumed the stock after our read.
        let decremented = sqlx::query(
            "UPDATE products
             SET current_stock = current_stock - ?1
             WHERE id = ?2 AND current_stock >= ?1",
        )
        .bind(quantity)
        .bind(product_id.0)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(Attempt::Conflict);
        }

        let total = sale_price * Decimal::from(quantity);
        let created_at = Utc::now();

        let sale_insert = sqlx::query("INSERT INTO sales (created_at, total) VALUES (?1, ?2)")
            .bind(created_at.to_rfc3339())
            .bind(total.to_string())
            .execute(&mut *tx)
            .await?;
        let sale_id = SaleId(sale_insert.last_insert_rowid());

        sqlx::query(
            "INSERT INTO sale_line_items
                 (sale_id, product_id, quantity, unit_sale_price, unit_cost_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(sale_id.0)
        .bind(product_id.0)
        .bind(quantity)
        .bind(sale_price.to_string())
        .bind(cost_price.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Attempt::Committed(SaleReceipt {
            sale_id,
            product_id,
            product_name,
            quantity,
            total,
            remaining_stock: current_stock - quantity,
        }))
    }

    async fn available_stock(&self, product_id: ProductId) -> Result<i64, RegisterSaleError> {
        sqlx::query_scalar::<_, i64>("SELECT current_stock FROM products WHERE id = ?1")
            .bind(product_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RegisterSaleError::ProductNotFound(product_id))
    }
}

enum Attempt {
    Committed(SaleReceipt),
    Conflict,
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6), and SQLITE_BUSY_SNAPSHOT (517) mean a
/// concurrent writer beat this transaction, not that the sale is invalid.
fn is_lock_contention(error: &RegisterSaleError) -> bool {
    match error {
        RegisterSaleError::Repository(RepositoryError::Database(sqlx::Error::Database(db))) => {
            matches!(db.code().as_deref(), Some("5") | Some("6") | Some("517"))
        }
        _ => false,
    }
}

#[async_trait]
impl SaleRepository for SqlSaleRepository {
    async fn register(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<SaleReceipt, RegisterSaleError> {
        // One automatic retry after a guarded-decrement conflict or sqlite
        // lock contention; a second conflict is answered with the freshest
        // stock figure instead of committing anything.
        match self.try_register(product_id, quantity).await {
            Ok(Attempt::Committed(receipt)) => return Ok(receipt),
            Ok(Attempt::Conflict) => {}
            Err(error) if is_lock_contention(&error) => {}
            Err(error) => return Err(error),
        }

        match self.try_register(product_id, quantity).await? {
            Attempt::Committed(receipt) => Ok(receipt),
            Attempt::Conflict => {
                let available = self.available_stock(product_id).await?;
                Err(RegisterSaleError::InsufficientStock { available })
            }
        }
    }

    async fn total_sold(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT IFNULL(SUM(quantity), 0) FROM sale_line_items WHERE product_id = ?1",
        )
        .bind(product_id.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn top_sellers(&self, limit: u32) -> Result<Vec<TopSeller>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT p.id, p.name, p.sale_price, SUM(li.quantity) AS total_quantity
             FROM sale_line_items li
             JOIN products p ON p.id = li.product_id
             GROUP BY p.id, p.name, p.sale_price
             ORDER BY total_quantity DESC, p.id ASC
             LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TopSeller {
                    product_id: ProductId(row.try_get("id")?),
                    name: row.try_get("name")?,
                    sale_price: decimal_column(row, "sale_price")?,
                    total_quantity: row.try_get("total_quantity")?,
                })
            })
            .collect()
    }
}
