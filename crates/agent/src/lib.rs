//! LLM boundary - natural-language intent classification
//!
//! This crate owns the only non-deterministic integration in the system: the
//! call that turns a staff member's free-text message into a structured
//! [`tendero_core::intent::ChatIntent`].
//!
//! # Architecture
//!
//! 1. **Prompting** (`classifier`) - a fixed Spanish instruction block with
//!    the message interpolated at the end
//! 2. **Transport** (`llm`) - the `LlmClient` capability, injected so tests
//!    substitute a deterministic double
//! 3. **Fallback policy** - any failure (unreachable endpoint, prose answer,
//!    broken JSON) resolves to the clarification intent, never to an error
//!
//! # Safety principle
//!
//! The LLM is strictly a translator. It NEVER decides stock levels, prices,
//! or whether a sale commits. Those are deterministic decisions made by the
//! executor and the repositories.

pub mod classifier;
pub mod llm;

pub use classifier::IntentClassifier;
pub use llm::{HttpLlmClient, LlmClient};
