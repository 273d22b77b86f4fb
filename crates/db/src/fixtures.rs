use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Canonical demo seeds and verification contract for the stationery catalog.
const SEED_PRODUCTS: &[SeedProductContract] = &[
    SeedProductContract {
        name: "Cuaderno",
        sale_price: "1.50",
        current_stock: 10,
        category: "Papelería",
        units_sold: 3,
    },
    SeedProductContract {
        name: "Cuaderno Azul",
        sale_price: "1.75",
        current_stock: 8,
        category: "Papelería",
        units_sold: 0,
    },
    SeedProductContract {
        name: "Cuaderno Rojo",
        sale_price: "1.75",
        current_stock: 6,
        category: "Papelería",
        units_sold: 0,
    },
    SeedProductContract {
        name: "Lapicero",
        sale_price: "0.50",
        current_stock: 30,
        category: "Papelería",
        units_sold: 0,
    },
    SeedProductContract {
        name: "Tijeras Escolares",
        sale_price: "2.20",
        current_stock: 4,
        category: "Oficina",
        units_sold: 0,
    },
];

const SEED_CATEGORY_NAMES: &[&str] = &["Papelería", "Oficina"];

/// Demo seed dataset: a small stationery catalog plus one historical sale so
/// the best-sellers and fact-sheet paths have data on first run.
pub struct DemoSeedDataset;

#[derive(Debug, Clone)]
struct SeedProductContract {
    name: &'static str,
    sale_price: &'static str,
    current_stock: i64,
    category: &'static str,
    units_sold: i64,
}

#[derive(Debug, Clone)]
pub struct SeededProductInfo {
    pub name: &'static str,
    pub current_stock: i64,
}

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub products_seeded: Vec<SeededProductInfo>,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl DemoSeedDataset {
    /// SQL fixture content for the demo seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let products_seeded = SEED_PRODUCTS
            .iter()
            .map(|product| SeededProductInfo {
                name: product.name,
                current_stock: product.current_stock,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { products_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for category in SEED_CATEGORY_NAMES {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)")
                    .bind(category)
                    .fetch_one(pool)
                    .await?;
            checks.push((*category, exists == 1));
        }

        for product in SEED_PRODUCTS {
            let product_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                     SELECT 1 FROM products p
                     JOIN categories c ON c.id = p.category_id
                     WHERE p.name = ?1
                       AND p.sale_price = ?2
                       AND p.current_stock = ?3
                       AND c.name = ?4
                       AND p.active = 1
                 )",
            )
            .bind(product.name)
            .bind(product.sale_price)
            .bind(product.current_stock)
            .bind(product.category)
            .fetch_one(pool)
            .await?;
            checks.push((product.name, product_ok == 1));

            let units_sold: i64 = sqlx::query_scalar(
                "SELECT IFNULL(SUM(li.quantity), 0)
                 FROM sale_line_items li
                 JOIN products p ON p.id = li.product_id
                 WHERE p.name = ?1",
            )
            .bind(product.name)
            .fetch_one(pool)
            .await?;
            checks.push(("units-sold", units_sold == product.units_sold));
        }

        let sale_totals_consistent: i64 = sqlx::query_scalar(
            "SELECT NOT EXISTS(
                 SELECT 1 FROM sales s
                 WHERE CAST(s.total AS REAL) <> (
                     SELECT IFNULL(SUM(li.quantity * CAST(li.unit_sale_price AS REAL)), 0)
                     FROM sale_line_items li
                     WHERE li.sale_id = s.id
                 )
             )",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("sale-totals-consistent", sale_totals_consistent == 1));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }
}

#[cfg(test)]
mod tests {
    use crate::{connect_with_settings, migrations};

    use super::DemoSeedDataset;

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let result = DemoSeedDataset::load(&pool).await.expect("seed");
        assert_eq!(result.products_seeded.len(), 5);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        let failed: Vec<_> =
            verification.checks.iter().filter(|(_, passed)| !passed).map(|(c, _)| *c).collect();
        assert!(verification.all_present, "failed checks: {failed:?}");

        pool.close().await;
    }

    #[tokio::test]
    async fn seed_reloads_idempotently_into_the_same_database() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        DemoSeedDataset::load(&pool).await.expect("first seed");
        DemoSeedDataset::load(&pool).await.expect("second seed");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present);

        let product_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&pool).await.expect("count");
        assert_eq!(product_count, 5);

        pool.close().await;
    }

    #[tokio::test]
    async fn verify_detects_tampered_stock() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        DemoSeedDataset::load(&pool).await.expect("seed");

        sqlx::query("UPDATE products SET current_stock = 999 WHERE name = 'Cuaderno'")
            .execute(&pool)
            .await
            .expect("tamper");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);

        pool.close().await;
    }
}
