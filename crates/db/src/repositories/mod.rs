use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use tendero_core::domain::conversation::{Conversation, ConversationId, Message, MessageRole};
use tendero_core::domain::product::{Product, ProductId};
use tendero_core::domain::sale::SaleId;

pub mod conversation;
pub mod memory;
pub mod product;
pub mod sale;

pub use conversation::SqlConversationRepository;
pub use memory::InMemoryStore;
pub use product::SqlProductRepository;
pub use sale::SqlSaleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

pub(crate) fn decimal_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    use sqlx::Row;

    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|_| {
        RepositoryError::Decode(format!("column `{column}` holds a non-decimal value: `{raw}`"))
    })
}

pub(crate) fn datetime_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<chrono::DateTime<chrono::Utc>, RepositoryError> {
    use sqlx::Row;

    let raw: String = row.try_get(column)?;
    chrono::DateTime::parse_from_rfc3339(&raw).map(|value| value.with_timezone(&chrono::Utc)).map_err(
        |_| RepositoryError::Decode(format!("column `{column}` holds a non-rfc3339 value: `{raw}`")),
    )
}

/// Outcome of a committed sale: what the chat layer needs to word the reply.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleReceipt {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub total: Decimal,
    pub remaining_stock: i64,
}

#[derive(Debug, Error)]
pub enum RegisterSaleError {
    #[error("product {0:?} not found")]
    ProductNotFound(ProductId),
    #[error("insufficient stock: {available} available")]
    InsufficientStock { available: i64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for RegisterSaleError {
    fn from(value: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(value))
    }
}

/// One row of the best-sellers aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct TopSeller {
    pub product_id: ProductId,
    pub name: String,
    pub sale_price: Decimal,
    pub total_quantity: i64,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Active catalog slice in store iteration order. The matcher's
    /// suggestion tie-breaks depend on this order staying stable.
    async fn list_active(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Register a one-line sale: stock-sufficiency check, sale + line-item
    /// creation with price snapshots, total computation, and stock decrement,
    /// all inside one atomic unit of work. A concurrent sale invalidating the
    /// check between read and commit is retried once, then surfaced as
    /// `InsufficientStock`.
    async fn register(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<SaleReceipt, RegisterSaleError>;

    /// Total units ever sold for one product.
    async fn total_sold(&self, product_id: ProductId) -> Result<i64, RepositoryError>;

    /// Per-product quantity aggregation across all history, descending.
    async fn top_sellers(&self, limit: u32) -> Result<Vec<TopSeller>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create(&self) -> Result<Conversation, RepositoryError>;

    async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, RepositoryError>;

    /// Active conversations, most recently updated first.
    async fn list_active(&self) -> Result<Vec<Conversation>, RepositoryError>;

    /// Append a message and bump the conversation's `updated_at`.
    async fn append_message(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        body: &str,
    ) -> Result<Message, RepositoryError>;

    async fn messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn user_message_count(
        &self,
        conversation_id: ConversationId,
    ) -> Result<i64, RepositoryError>;

    async fn set_title(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), RepositoryError>;
}
