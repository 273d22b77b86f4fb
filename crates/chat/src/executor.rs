//! Intent dispatch against the inventory/sales store.
//!
//! Each call is a pure mapping from (intent, store snapshot) to (reply,
//! optional mutation); no state survives between invocations. Sale
//! registration is the single mutating branch and delegates its atomicity to
//! the sale repository.

use std::sync::Arc;

use tracing::info;

use tendero_core::domain::product::Product;
use tendero_core::domain::sale::SaleDraft;
use tendero_core::errors::{ApplicationError, DomainError};
use tendero_core::intent::{ChatAction, ChatIntent};
use tendero_core::matcher::{self, MatchOutcome};
use tendero_db::repositories::{
    ProductRepository, RegisterSaleError, RepositoryError, SaleRepository,
};

use crate::replies::{MatchPurpose, Reply};

pub struct ActionExecutor {
    products: Arc<dyn ProductRepository>,
    sales: Arc<dyn SaleRepository>,
    match_threshold: u8,
}

/// Result of running the matcher against the active catalog: either a single
/// product to act on (with the note to show when the hit was not exact) or a
/// ready-made re-prompt reply.
enum Resolution {
    Hit { product: Product, matched_note: Option<String> },
    Reprompt(Reply),
}

impl ActionExecutor {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        sales: Arc<dyn SaleRepository>,
        match_threshold: u8,
    ) -> Self {
        Self { products, sales, match_threshold }
    }

    pub async fn execute(&self, intent: &ChatIntent) -> Result<Reply, ApplicationError> {
        match intent.action {
            ChatAction::StartSaleFlow => Ok(Reply::SaleFlowPrompt),
            ChatAction::RegisterSale => self.register_sale(intent).await,
            ChatAction::LookupProduct => self.lookup_product(intent).await,
            ChatAction::TopSellers => self.top_sellers().await,
            ChatAction::ListCatalog => self.list_catalog().await,
            ChatAction::RequestClarification => Ok(Reply::Clarification),
            ChatAction::Unknown => Ok(Reply::NotUnderstood),
        }
    }

    async fn register_sale(&self, intent: &ChatIntent) -> Result<Reply, ApplicationError> {
        let quantity = intent.quantity_or_default();

        let (product, matched_note) =
            match self.resolve(intent.product_name(), MatchPurpose::Register).await? {
                Resolution::Hit { product, matched_note } => (product, matched_note),
                Resolution::Reprompt(reply) => return Ok(reply),
            };

        // Pre-flight validation against the snapshot we just read; the
        // repository re-checks inside the transaction before committing.
        if let Err(error) = SaleDraft::single_line(&product, quantity) {
            return Ok(match error {
                DomainError::InsufficientStock { available, .. } => Reply::InsufficientStock {
                    product_name: product.name.clone(),
                    available,
                },
                DomainError::InvariantViolation(_) => Reply::Clarification,
            });
        }

        match self.sales.register(product.id, quantity).await {
            Ok(receipt) => {
                info!(
                    event_name = "chat.sale.registered",
                    product = %receipt.product_name,
                    quantity = receipt.quantity,
                    total = %receipt.total,
                    remaining_stock = receipt.remaining_stock,
                    "sale committed"
                );
                Ok(Reply::SaleRegistered {
                    product_name: receipt.product_name,
                    total: receipt.total,
                    remaining_stock: receipt.remaining_stock,
                    matched_note,
                })
            }
            Err(RegisterSaleError::InsufficientStock { available }) => {
                Ok(Reply::InsufficientStock { product_name: product.name, available })
            }
            Err(RegisterSaleError::ProductNotFound(_)) => Ok(Reply::ProductNotFound {
                query: intent.product_name().to_string(),
                suggestions: Vec::new(),
                purpose: MatchPurpose::Register,
            }),
            Err(RegisterSaleError::Repository(error)) => Err(persistence(error)),
        }
    }

    async fn lookup_product(&self, intent: &ChatIntent) -> Result<Reply, ApplicationError> {
        let (product, matched_note) =
            match self.resolve(intent.product_name(), MatchPurpose::Lookup).await? {
                Resolution::Hit { product, matched_note } => (product, matched_note),
                Resolution::Reprompt(reply) => return Ok(reply),
            };

        let total_sold = self.sales.total_sold(product.id).await.map_err(persistence)?;

        Ok(Reply::ProductFactSheet { product, total_sold, matched_note })
    }

    async fn top_sellers(&self) -> Result<Reply, ApplicationError> {
        let rows = self.sales.top_sellers(5).await.map_err(persistence)?;
        if rows.is_empty() {
            return Ok(Reply::NoSalesYet);
        }

        let grand_total = rows.iter().map(|row| row.total_quantity).sum();
        Ok(Reply::TopSellers { rows, grand_total })
    }

    async fn list_catalog(&self) -> Result<Reply, ApplicationError> {
        let products = self.products.list_active().await.map_err(persistence)?;
        if products.is_empty() {
            return Ok(Reply::EmptyCatalog);
        }

        Ok(Reply::Catalog { products })
    }

    async fn resolve(
        &self,
        query: &str,
        purpose: MatchPurpose,
    ) -> Result<Resolution, ApplicationError> {
        // Blank queries never touch the store.
        if query.trim().is_empty() {
            return Ok(Resolution::Reprompt(Reply::ProductNotFound {
                query: query.to_string(),
                suggestions: Vec::new(),
                purpose,
            }));
        }

        let catalog = self.products.list_active().await.map_err(persistence)?;

        Ok(match matcher::resolve(query, &catalog, self.match_threshold) {
            MatchOutcome::Exact(product) => Resolution::Hit { product, matched_note: None },
            MatchOutcome::Unique { product, .. } => {
                let matched_note = Some(product.name.clone());
                Resolution::Hit { product, matched_note }
            }
            MatchOutcome::Ambiguous { suggestions, .. } => Resolution::Reprompt(
                Reply::AmbiguousProduct { query: query.to_string(), suggestions, purpose },
            ),
            MatchOutcome::NotFound { suggestions } => Resolution::Reprompt(
                Reply::ProductNotFound { query: query.to_string(), suggestions, purpose },
            ),
        })
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use tendero_core::domain::product::{Category, CategoryId, Product, ProductId};
    use tendero_core::intent::{ChatAction, ChatIntent};
    use tendero_core::matcher::DEFAULT_FUZZY_THRESHOLD;
    use tendero_db::repositories::{InMemoryStore, SaleRepository};

    use crate::replies::Reply;

    use super::ActionExecutor;

    fn product(id: i64, name: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: ProductId(id),
            name: name.to_string(),
            sale_price: Decimal::new(price_cents, 2),
            cost_price: Decimal::new(price_cents / 2, 2),
            current_stock: stock,
            minimum_stock: 2,
            category: Category { id: CategoryId(1), name: "Papelería".to_string() },
            active: true,
        }
    }

    fn executor_with(products: Vec<Product>) -> (Arc<InMemoryStore>, ActionExecutor) {
        let store = Arc::new(InMemoryStore::with_products(products));
        let executor = ActionExecutor::new(store.clone(), store.clone(), DEFAULT_FUZZY_THRESHOLD);
        (store, executor)
    }

    fn intent(action: ChatAction, product: Option<&str>, quantity: Option<i64>) -> ChatIntent {
        ChatIntent { action, product: product.map(str::to_string), quantity }
    }

    #[tokio::test]
    async fn registers_sale_with_total_and_decremented_stock() {
        let (store, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("cuaderno"), Some(3)))
            .await
            .expect("execute");

        match reply {
            Reply::SaleRegistered { product_name, total, remaining_stock, matched_note } => {
                assert_eq!(product_name, "Cuaderno");
                assert_eq!(total, Decimal::new(450, 2));
                assert_eq!(remaining_stock, 7);
                assert_eq!(matched_note, None, "case-insensitive exact match needs no note");
            }
            other => panic!("expected sale registered, got {other:?}"),
        }

        assert_eq!(store.total_sold(ProductId(1)).await.expect("total"), 3);
    }

    #[tokio::test]
    async fn insufficient_stock_reports_available_and_mutates_nothing() {
        let (store, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("cuaderno"), Some(15)))
            .await
            .expect("execute");

        assert_eq!(
            reply,
            Reply::InsufficientStock { product_name: "Cuaderno".to_string(), available: 10 }
        );
        assert_eq!(store.total_sold(ProductId(1)).await.expect("total"), 0);
    }

    #[tokio::test]
    async fn ambiguous_prefix_lists_both_candidates_without_selling() {
        let (store, executor) = executor_with(vec![
            product(1, "Cuaderno Azul", 175, 8),
            product(2, "Cuaderno Rojo", 175, 6),
        ]);

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("cuaderno"), Some(1)))
            .await
            .expect("execute");

        match reply {
            Reply::AmbiguousProduct { suggestions, .. } => {
                assert_eq!(suggestions, vec!["Cuaderno Azul", "Cuaderno Rojo"]);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }

        assert_eq!(store.total_sold(ProductId(1)).await.expect("total"), 0);
        assert_eq!(store.total_sold(ProductId(2)).await.expect("total"), 0);
    }

    #[tokio::test]
    async fn typo_sale_carries_disambiguation_note() {
        let (_, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("cuadreno"), None))
            .await
            .expect("execute");

        match reply {
            Reply::SaleRegistered { matched_note, remaining_stock, .. } => {
                assert_eq!(matched_note.as_deref(), Some("Cuaderno"));
                assert_eq!(remaining_stock, 9, "default quantity is one unit");
            }
            other => panic!("expected sale registered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_product_yields_not_found_reply() {
        let (_, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("zzzzqqqq"), Some(1)))
            .await
            .expect("execute");

        match reply {
            Reply::ProductNotFound { suggestions, .. } => assert!(suggestions.is_empty()),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_positive_quantity_asks_for_clarification() {
        let (store, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("cuaderno"), Some(0)))
            .await
            .expect("execute");

        assert_eq!(reply, Reply::Clarification);
        assert_eq!(store.total_sold(ProductId(1)).await.expect("total"), 0);
    }

    #[tokio::test]
    async fn lookup_builds_fact_sheet_with_sales_history() {
        let (store, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);
        store.register(ProductId(1), 4).await.expect("seed sale");

        let reply = executor
            .execute(&intent(ChatAction::LookupProduct, Some("Cuaderno"), None))
            .await
            .expect("execute");

        match reply {
            Reply::ProductFactSheet { product, total_sold, matched_note } => {
                assert_eq!(product.name, "Cuaderno");
                assert_eq!(product.current_stock, 6);
                assert_eq!(total_sold, 4);
                assert_eq!(matched_note, None);
            }
            other => panic!("expected fact sheet, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn top_sellers_ranks_and_totals() {
        let (store, executor) =
            executor_with(vec![product(1, "Cuaderno", 150, 10), product(2, "Lapicero", 50, 30)]);
        store.register(ProductId(2), 5).await.expect("sale");
        store.register(ProductId(1), 3).await.expect("sale");

        let reply =
            executor.execute(&intent(ChatAction::TopSellers, None, None)).await.expect("execute");

        match reply {
            Reply::TopSellers { rows, grand_total } => {
                assert_eq!(rows[0].name, "Lapicero");
                assert_eq!(rows[1].name, "Cuaderno");
                assert_eq!(grand_total, 8);
            }
            other => panic!("expected top sellers, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_sales_yield_empty_state() {
        let (_, executor) = executor_with(vec![product(1, "Cuaderno", 150, 10)]);

        let reply =
            executor.execute(&intent(ChatAction::TopSellers, None, None)).await.expect("execute");
        assert_eq!(reply, Reply::NoSalesYet);
    }

    #[tokio::test]
    async fn empty_catalog_yields_empty_state_not_a_table() {
        let (_, executor) = executor_with(Vec::new());

        let reply =
            executor.execute(&intent(ChatAction::ListCatalog, None, None)).await.expect("execute");
        assert_eq!(reply, Reply::EmptyCatalog);
    }

    #[tokio::test]
    async fn read_only_actions_are_idempotent() {
        let (store, executor) =
            executor_with(vec![product(1, "Cuaderno", 150, 10), product(2, "Lapicero", 50, 30)]);
        store.register(ProductId(1), 2).await.expect("sale");

        for action in [ChatAction::LookupProduct, ChatAction::TopSellers, ChatAction::ListCatalog] {
            let request = intent(action, Some("Cuaderno"), None);
            let first = executor.execute(&request).await.expect("first");
            let second = executor.execute(&request).await.expect("second");
            assert_eq!(
                first.render_html(),
                second.render_html(),
                "{action:?} changed its answer without an intervening mutation"
            );
        }
    }

    #[tokio::test]
    async fn fixed_actions_never_touch_the_store() {
        let (_, executor) = executor_with(Vec::new());

        assert_eq!(
            executor
                .execute(&intent(ChatAction::StartSaleFlow, None, None))
                .await
                .expect("execute"),
            Reply::SaleFlowPrompt
        );
        assert_eq!(
            executor
                .execute(&intent(ChatAction::RequestClarification, None, None))
                .await
                .expect("execute"),
            Reply::Clarification
        );
        assert_eq!(
            executor.execute(&intent(ChatAction::Unknown, None, None)).await.expect("execute"),
            Reply::NotUnderstood
        );
    }

    #[tokio::test]
    async fn blank_product_name_is_not_found_without_store_access() {
        let (_, executor) = executor_with(Vec::new());

        let reply = executor
            .execute(&intent(ChatAction::RegisterSale, Some("   "), Some(1)))
            .await
            .expect("execute");

        assert!(matches!(reply, Reply::ProductNotFound { .. }));
    }
}
