use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use tendero_core::domain::product::{Category, CategoryId, Product, ProductId};

use super::{decimal_column, ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.sale_price, p.cost_price, p.current_stock, \
     p.minimum_stock, p.active, c.id AS category_id, c.name AS category_name";

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM products p
             JOIN categories c ON c.id = p.category_id
             WHERE p.active = 1
             ORDER BY p.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM products p
             JOIN categories c ON c.id = p.category_id
             WHERE p.id = ?1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }
}

pub(crate) fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        name: row.try_get("name")?,
        sale_price: decimal_column(row, "sale_price")?,
        cost_price: decimal_column(row, "cost_price")?,
        current_stock: row.try_get("current_stock")?,
        minimum_stock: row.try_get("minimum_stock")?,
        category: Category {
            id: CategoryId(row.try_get("category_id")?),
            name: row.try_get("category_name")?,
        },
        active: row.try_get::<i64, _>("active")? != 0,
    })
}

#[cfg(test)]
mod tests {
    use tendero_core::domain::product::ProductId;

    use crate::repositories::ProductRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlProductRepository;

    async fn seeded_pool() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        sqlx::query("INSERT INTO categories (name) VALUES ('Papelería')")
            .execute(&pool)
            .await
            .expect("seed category");
        sqlx::query(
            "INSERT INTO products
                 (name, sale_price, cost_price, current_stock, minimum_stock, category_id, active)
             VALUES
                 ('Cuaderno', '1.50', '0.90', 10, 2, 1, 1),
                 ('Lapicero', '0.50', '0.20', 30, 5, 1, 1),
                 ('Regla Descontinuada', '0.80', '0.40', 0, 0, 1, 0)",
        )
        .execute(&pool)
        .await
        .expect("seed products");

        pool
    }

    #[tokio::test]
    async fn list_active_excludes_inactive_and_keeps_store_order() {
        let pool = seeded_pool().await;
        let repo = SqlProductRepository::new(pool.clone());

        let products = repo.list_active().await.expect("list");
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();

        assert_eq!(names, vec!["Cuaderno", "Lapicero"]);
        pool.close().await;
    }

    #[tokio::test]
    async fn find_by_id_decodes_prices_and_category() {
        let pool = seeded_pool().await;
        let repo = SqlProductRepository::new(pool.clone());

        let product = repo.find_by_id(ProductId(1)).await.expect("query").expect("present");
        assert_eq!(product.name, "Cuaderno");
        assert_eq!(product.sale_price.to_string(), "1.50");
        assert_eq!(product.category.name, "Papelería");
        assert!(product.active);

        assert!(repo.find_by_id(ProductId(99)).await.expect("query").is_none());
        pool.close().await;
    }
}
