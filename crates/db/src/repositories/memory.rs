use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use tendero_core::domain::conversation::{
    Conversation, ConversationId, Message, MessageRole, DEFAULT_CONVERSATION_TITLE,
};
use tendero_core::domain::product::{Product, ProductId};
use tendero_core::domain::sale::{SaleId, SaleLineItem};

use super::{
    ConversationRepository, ProductRepository, RegisterSaleError, RepositoryError, SaleReceipt,
    SaleRepository, TopSeller,
};

/// Deterministic in-process stand-in for the SQL repositories. One store
/// backs all three traits so a registered sale mutates the same product list
/// the matcher reads, exactly like the shared database does.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    products: Vec<Product>,
    lines: Vec<SaleLineItem>,
    next_sale_id: i64,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
}

impl InMemoryStore {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            inner: RwLock::new(StoreState {
                products,
                lines: Vec::new(),
                next_sale_id: 1,
                conversations: Vec::new(),
                messages: Vec::new(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryStore {
    async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let state = self.inner.read().await;
        Ok(state.products.iter().filter(|p| p.active).cloned().collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.inner.read().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait::async_trait]
impl SaleRepository for InMemoryStore {
    async fn register(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<SaleReceipt, RegisterSaleError> {
        let mut guard = self.inner.write().await;
        let state = &mut *guard;

        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(RegisterSaleError::ProductNotFound(product_id))?;

        if product.current_stock < quantity {
            return Err(RegisterSaleError::InsufficientStock { available: product.current_stock });
        }

        product.current_stock -= quantity;
        let receipt = SaleReceipt {
            sale_id: SaleId(state.next_sale_id),
            product_id,
            product_name: product.name.clone(),
            quantity,
            total: product.sale_price * Decimal::from(quantity),
            remaining_stock: product.current_stock,
        };
        let line = SaleLineItem {
            product_id,
            quantity,
            unit_sale_price: product.sale_price,
            unit_cost_price: product.cost_price,
        };

        state.next_sale_id += 1;
        state.lines.push(line);

        Ok(receipt)
    }

    async fn total_sold(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let state = self.inner.read().await;
        Ok(state.lines.iter().filter(|l| l.product_id == product_id).map(|l| l.quantity).sum())
    }

    async fn top_sellers(&self, limit: u32) -> Result<Vec<TopSeller>, RepositoryError> {
        let state = self.inner.read().await;

        let mut sellers: Vec<TopSeller> = Vec::new();
        for product in &state.products {
            let total_quantity: i64 = state
                .lines
                .iter()
                .filter(|l| l.product_id == product.id)
                .map(|l| l.quantity)
                .sum();
            if total_quantity > 0 {
                sellers.push(TopSeller {
                    product_id: product.id,
                    name: product.name.clone(),
                    sale_price: product.sale_price,
                    total_quantity,
                });
            }
        }

        sellers.sort_by(|a, b| {
            b.total_quantity.cmp(&a.total_quantity).then(a.product_id.0.cmp(&b.product_id.0))
        });
        sellers.truncate(limit as usize);

        Ok(sellers)
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryStore {
    async fn create(&self) -> Result<Conversation, RepositoryError> {
        let mut state = self.inner.write().await;
        let now = Utc::now();
        let conversation = Conversation {
            id: ConversationId(state.conversations.len() as i64 + 1),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            created_at: now,
            updated_at: now,
            active: true,
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        let state = self.inner.read().await;
        Ok(state.conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Conversation>, RepositoryError> {
        let state = self.inner.read().await;
        let mut active: Vec<Conversation> =
            state.conversations.iter().filter(|c| c.active).cloned().collect();
        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.0.cmp(&a.id.0)));
        Ok(active)
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let mut state = self.inner.write().await;
        let now = Utc::now();

        if let Some(conversation) =
            state.conversations.iter_mut().find(|c| c.id == conversation_id)
        {
            conversation.updated_at = now;
        }

        let message =
            Message { conversation_id, role, body: body.to_string(), sent_at: now };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.inner.read().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn user_message_count(
        &self,
        conversation_id: ConversationId,
    ) -> Result<i64, RepositoryError> {
        let state = self.inner.read().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.role == MessageRole::User)
            .count() as i64)
    }

    async fn set_title(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.inner.write().await;
        if let Some(conversation) =
            state.conversations.iter_mut().find(|c| c.id == conversation_id)
        {
            conversation.title = title.to_string();
            conversation.updated_at = Utc::now();
        }
        Ok(())
    }
}
