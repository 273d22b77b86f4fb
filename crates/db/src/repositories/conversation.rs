use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use tendero_core::domain::conversation::{
    Conversation, ConversationId, Message, MessageRole, DEFAULT_CONVERSATION_TITLE,
};

use super::{datetime_column, ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn create(&self) -> Result<Conversation, RepositoryError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO conversations (title, created_at, updated_at, active)
             VALUES (?1, ?2, ?2, 1)",
        )
        .bind(DEFAULT_CONVERSATION_TITLE)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Conversation {
            id: ConversationId(inserted.last_insert_rowid()),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            created_at: now,
            updated_at: now,
            active: true,
        })
    }

    async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, created_at, updated_at, active FROM conversations WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, created_at, updated_at, active
             FROM conversations
             WHERE active = 1
             ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(conversation_from_row).collect()
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO messages (conversation_id, role, body, sent_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(conversation_id.0)
        .bind(role.as_str())
        .bind(body)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(now.to_rfc3339())
            .bind(conversation_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Message { conversation_id, role, body: body.to_string(), sent_at: now })
    }

    async fn messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT conversation_id, role, body, sent_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY sent_at ASC, id ASC",
        )
        .bind(conversation_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn user_message_count(
        &self,
        conversation_id: ConversationId,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1 AND role = 'user'",
        )
        .bind(conversation_id.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn set_title(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(title)
            .bind(Utc::now().to_rfc3339())
            .bind(conversation_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn conversation_from_row(row: &SqliteRow) -> Result<Conversation, RepositoryError> {
    Ok(Conversation {
        id: ConversationId(row.try_get("id")?),
        title: row.try_get("title")?,
        created_at: datetime_column(row, "created_at")?,
        updated_at: datetime_column(row, "updated_at")?,
        active: row.try_get::<i64, _>("active")? != 0,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message, RepositoryError> {
    let role: String = row.try_get("role")?;
    let role = match role.as_str() {
        "user" => MessageRole::User,
        "assistant" => MessageRole::Assistant,
        other => {
            return Err(RepositoryError::Decode(format!("unknown message role `{other}`")));
        }
    };

    Ok(Message {
        conversation_id: ConversationId(row.try_get("conversation_id")?),
        role,
        body: row.try_get("body")?,
        sent_at: datetime_column(row, "sent_at")?,
    })
}
