use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

pub const DEFAULT_CONVERSATION_TITLE: &str = "Nueva conversación";

const AUTO_TITLE_MAX_CHARS: usize = 50;

/// Derive a conversation title from its first user message: the first 50
/// characters, with an ellipsis when the message keeps going.
pub fn auto_title(first_user_message: &str) -> String {
    let trimmed = first_user_message.trim();
    if trimmed.is_empty() {
        return DEFAULT_CONVERSATION_TITLE.to_string();
    }

    let mut title: String = trimmed.chars().take(AUTO_TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > AUTO_TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::{auto_title, DEFAULT_CONVERSATION_TITLE};

    #[test]
    fn short_message_becomes_title_verbatim() {
        assert_eq!(auto_title("Vendí 3 cuadernos"), "Vendí 3 cuadernos");
    }

    #[test]
    fn long_message_is_truncated_with_ellipsis() {
        let message = "a".repeat(80);
        let title = auto_title(&message);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let message = "á".repeat(60);
        let title = auto_title(&message);
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn blank_message_falls_back_to_default_title() {
        assert_eq!(auto_title("   "), DEFAULT_CONVERSATION_TITLE);
    }
}
