//! Chat and conversation routes.
//!
//! The request layer owns input validation (a chat message without a known
//! conversation thread never reaches the core) and the message-history
//! bookkeeping around each exchange: persist the user message, auto-title the
//! thread on its first message, classify, execute, persist the reply.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use tendero_agent::IntentClassifier;
use tendero_chat::ActionExecutor;
use tendero_core::domain::conversation::{
    auto_title, Conversation, ConversationId, Message, MessageRole,
};
use tendero_db::repositories::ConversationRepository;

#[derive(Clone)]
pub struct ChatState {
    classifier: Arc<IntentClassifier>,
    executor: Arc<ActionExecutor>,
    conversations: Arc<dyn ConversationRepository>,
}

impl ChatState {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        executor: Arc<ActionExecutor>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self { classifier, executor, conversations }
    }
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/conversations", post(create_conversation).get(list_conversations))
        .route("/api/conversations/{id}/messages", get(conversation_messages))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub conversation_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: i64,
    pub kind: &'static str,
    pub reply_html: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationPayload {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct MessagePayload {
    pub role: &'static str,
    pub body: String,
    pub sent_at: String,
}

impl From<Conversation> for ConversationPayload {
    fn from(value: Conversation) -> Self {
        Self {
            id: value.id.0,
            title: value.title,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<Message> for MessagePayload {
    fn from(value: Message) -> Self {
        Self { role: value.role.as_str(), body: value.body, sent_at: value.sent_at.to_rfc3339() }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message.to_string() }))
}

fn unavailable(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { error: message.to_string() }))
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let correlation_id = Uuid::new_v4().to_string();

    let Some(conversation_id) = request.conversation_id.map(ConversationId) else {
        return Err(bad_request("conversation_id is required"));
    };
    let message = request.message.trim();
    if message.is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let conversation = state
        .conversations
        .find(conversation_id)
        .await
        .map_err(|error| {
            error!(
                event_name = "server.chat.conversation_load_failed",
                correlation_id = %correlation_id,
                conversation_id = conversation_id.0,
                error = %error,
                "could not load conversation"
            );
            unavailable("conversation store unavailable")
        })?
        .ok_or_else(|| bad_request("unknown conversation_id"))?;

    state
        .conversations
        .append_message(conversation.id, MessageRole::User, message)
        .await
        .map_err(|error| {
            error!(
                event_name = "server.chat.persist_user_message_failed",
                correlation_id = %correlation_id,
                conversation_id = conversation.id.0,
                error = %error,
                "could not persist user message"
            );
            unavailable("conversation store unavailable")
        })?;

    maybe_auto_title(&state, conversation.id, message, &correlation_id).await;

    let intent = state.classifier.classify(message).await;
    info!(
        event_name = "server.chat.intent_classified",
        correlation_id = %correlation_id,
        conversation_id = conversation.id.0,
        action = ?intent.action,
        "message classified"
    );

    let reply = state.executor.execute(&intent).await.map_err(|error| {
        error!(
            event_name = "server.chat.execution_failed",
            correlation_id = %correlation_id,
            conversation_id = conversation.id.0,
            error = %error,
            "intent execution failed"
        );
        unavailable(error.clone().into_interface(correlation_id.clone()).user_message())
    })?;

    let reply_html = reply.render_html();
    state
        .conversations
        .append_message(conversation.id, MessageRole::Assistant, &reply_html)
        .await
        .map_err(|error| {
            error!(
                event_name = "server.chat.persist_reply_failed",
                correlation_id = %correlation_id,
                conversation_id = conversation.id.0,
                error = %error,
                "could not persist assistant reply"
            );
            unavailable("conversation store unavailable")
        })?;

    Ok(Json(ChatResponse { conversation_id: conversation.id.0, kind: reply.kind(), reply_html }))
}

/// Title the thread after its first user message, mirroring the stored
/// history rather than the raw request so retries stay consistent.
async fn maybe_auto_title(
    state: &ChatState,
    conversation_id: ConversationId,
    message: &str,
    correlation_id: &str,
) {
    match state.conversations.user_message_count(conversation_id).await {
        Ok(1) => {
            if let Err(error) =
                state.conversations.set_title(conversation_id, &auto_title(message)).await
            {
                error!(
                    event_name = "server.chat.auto_title_failed",
                    correlation_id = %correlation_id,
                    conversation_id = conversation_id.0,
                    error = %error,
                    "could not auto-title conversation"
                );
            }
        }
        Ok(_) => {}
        Err(error) => {
            error!(
                event_name = "server.chat.auto_title_failed",
                correlation_id = %correlation_id,
                conversation_id = conversation_id.0,
                error = %error,
                "could not count user messages"
            );
        }
    }
}

pub async fn create_conversation(
    State(state): State<ChatState>,
) -> Result<Json<ConversationPayload>, (StatusCode, Json<ErrorResponse>)> {
    let conversation = state
        .conversations
        .create()
        .await
        .map_err(|_| unavailable("conversation store unavailable"))?;

    Ok(Json(conversation.into()))
}

pub async fn list_conversations(
    State(state): State<ChatState>,
) -> Result<Json<Vec<ConversationPayload>>, (StatusCode, Json<ErrorResponse>)> {
    let conversations = state
        .conversations
        .list_active()
        .await
        .map_err(|_| unavailable("conversation store unavailable"))?;

    Ok(Json(conversations.into_iter().map(ConversationPayload::from).collect()))
}

pub async fn conversation_messages(
    State(state): State<ChatState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MessagePayload>>, (StatusCode, Json<ErrorResponse>)> {
    let conversation_id = ConversationId(id);

    state
        .conversations
        .find(conversation_id)
        .await
        .map_err(|_| unavailable("conversation store unavailable"))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse { error: "unknown conversation_id".to_string() }),
            )
        })?;

    let messages = state
        .conversations
        .messages(conversation_id)
        .await
        .map_err(|_| unavailable("conversation store unavailable"))?;

    Ok(Json(messages.into_iter().map(MessagePayload::from).collect()))
}
