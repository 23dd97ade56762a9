//! Chat Memory: per-session conversation history.
//!
//! `AppState` holds an `Arc<dyn ChatMemory>`; the default backend is the
//! Postgres `messages` table.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::documents::DocChunk;
use crate::chat::context::{preview, CITATION_PREVIEW_CHARS};
use crate::llm_client::ChatMessage;
use crate::models::chat::{ChatRole, Citation, MessageRow};

/// A message about to be persisted.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub citations: Vec<Citation>,
}

impl NewMessage {
    pub fn new(session_id: Uuid, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            session_id,
            role,
            content: content.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

#[async_trait]
pub trait ChatMemory: Send + Sync {
    /// Last `limit` messages of a session, oldest first.
    async fn recent(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>>;

    /// Full stored history of a session, oldest first.
    async fn history(&self, session_id: Uuid) -> Result<Vec<MessageRow>>;

    async fn append(&self, messages: &[NewMessage]) -> Result<()>;

    /// Deletes a session's messages, returning how many were removed.
    async fn clear(&self, session_id: Uuid) -> Result<u64>;
}

/// Rough token estimate: one token per four characters.
pub fn estimate_tokens(text: &str) -> i32 {
    text.chars().count().div_ceil(4) as i32
}

pub fn citations_for(chunks: &[DocChunk]) -> Vec<Citation> {
    chunks
        .iter()
        .map(|chunk| Citation {
            url: chunk.source_url.clone(),
            text: preview(&chunk.text, CITATION_PREVIEW_CHARS),
        })
        .collect()
}

pub struct PgChatMemory {
    pool: PgPool,
}

impl PgChatMemory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatMemory for PgChatMemory {
    async fn recent(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT * FROM messages WHERE session_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|row| ChatMessage::new(ChatRole::from_db(&row.role), row.content))
            .collect())
    }

    async fn history(&self, session_id: Uuid) -> Result<Vec<MessageRow>> {
        Ok(sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn append(&self, messages: &[NewMessage]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            let citations = (!message.citations.is_empty()).then(|| Json(&message.citations));
            sqlx::query(
                r#"
                INSERT INTO messages (session_id, role, content, tokens, citations)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(message.session_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(estimate_tokens(&message.content))
            .bind(citations)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_citations_preview_chunk_text() {
        let chunks = vec![DocChunk {
            text: "x".repeat(250),
            source_url: Some("https://uwaterloo.ca/ece".to_string()),
            similarity: 0.7,
        }];
        let citations = citations_for(&chunks);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].url.as_deref(), Some("https://uwaterloo.ca/ece"));
        assert_eq!(citations[0].text.len(), 203);
        assert!(citations[0].text.ends_with("..."));
    }

    #[test]
    fn test_new_message_defaults_to_no_citations() {
        let msg = NewMessage::new(Uuid::nil(), ChatRole::User, "hi");
        assert!(msg.citations.is_empty());
        let msg = msg.with_citations(vec![Citation {
            url: None,
            text: "t".to_string(),
        }]);
        assert_eq!(msg.citations.len(), 1);
    }
}
