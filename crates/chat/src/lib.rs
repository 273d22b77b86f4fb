//! Conversational surface - intent execution and reply formatting
//!
//! This crate turns a classified [`tendero_core::intent::ChatIntent`] into a
//! store effect and a formatted answer:
//! - **Executor** (`executor`) - dispatches actions against the repositories;
//!   the only mutating path is sale registration
//! - **Replies** (`replies`) - typed reply model plus its HTML rendering, the
//!   presentation contract the web chat displays verbatim
//!
//! # Architecture
//!
//! ```text
//! Inbound text → IntentClassifier → ChatIntent → ActionExecutor → Reply
//!                                                     ↓
//!                                      ProductRepository / SaleRepository
//! ```
//!
//! # Key Types
//!
//! - `ActionExecutor` - per-request mapping from intent to reply
//! - `Reply` - structured outcome; `render_html` produces the chat bubble

pub mod executor;
pub mod replies;

pub use executor::ActionExecutor;
pub use replies::{MatchPurpose, Reply};
