pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod matcher;

pub use chrono;
pub use rust_decimal;

pub use domain::conversation::{
    auto_title, Conversation, ConversationId, Message, MessageRole, DEFAULT_CONVERSATION_TITLE,
};
pub use domain::product::{Category, CategoryId, Product, ProductId};
pub use domain::sale::{Sale, SaleDraft, SaleId, SaleLineItem};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use intent::{ChatAction, ChatIntent};
pub use matcher::{resolve, token_sort_ratio, MatchOutcome, DEFAULT_FUZZY_THRESHOLD};
