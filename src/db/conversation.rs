//! Conversation store: one document per identity

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;
use serde_json::{Map, Value};

use super::DbPool;
use crate::chat::Message;
use crate::{Error, Result};

/// Persisted conversation history keyed by identity id
///
/// Writes upsert with merge semantics: fields of the stored document other
/// than `messages` survive a write.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Read the stored messages for `user_id`
    ///
    /// Returns `Ok(None)` when no document exists or its `messages` field is
    /// missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached
    async fn read(&self, user_id: &str) -> Result<Option<Vec<Message>>>;

    /// Replace the stored messages for `user_id`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or written
    async fn write(&self, user_id: &str, messages: &[Message]) -> Result<()>;
}

/// `SQLite`-backed conversation store
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DbPool,
}

impl SqliteConversationStore {
    /// Create a new conversation store
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetch the raw stored document for `user_id`
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn document(&self, user_id: &str) -> Result<Option<Value>> {
        let conn = super::conn(&self.pool)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT document FROM conversations WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| serde_json::from_str(&text).map_err(Error::from))
            .transpose()
    }

    fn read_blocking(&self, user_id: &str) -> Result<Option<Vec<Message>>> {
        let Some(document) = self.document(user_id)? else {
            return Ok(None);
        };

        let Some(messages) = document.get("messages").cloned() else {
            return Ok(None);
        };

        match serde_json::from_value::<Vec<Message>>(messages) {
            Ok(messages) => Ok(Some(messages)),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "stored conversation is unreadable");
                Ok(None)
            }
        }
    }

    fn write_blocking(&self, user_id: &str, messages: &[Message]) -> Result<()> {
        let mut conn = super::conn(&self.pool)?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT document FROM conversations WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;

        // Merge into the existing object; anything that isn't an object is replaced
        let mut document = existing
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_else(Map::new);
        document.insert("messages".to_string(), serde_json::to_value(messages)?);

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO conversations (user_id, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
            rusqlite::params![user_id, Value::Object(document).to_string(), now],
        )?;
        tx.commit()?;

        tracing::debug!(user_id, messages = messages.len(), "conversation persisted");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn read(&self, user_id: &str) -> Result<Option<Vec<Message>>> {
        let store = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || store.read_blocking(&user_id))
            .await
            .map_err(|e| Error::Persistence(format!("conversation read task failed: {e}")))?
    }

    async fn write(&self, user_id: &str, messages: &[Message]) -> Result<()> {
        let store = self.clone();
        let user_id = user_id.to_string();
        let messages = messages.to_vec();
        tokio::task::spawn_blocking(move || store.write_blocking(&user_id, &messages))
            .await
            .map_err(|e| Error::Persistence(format!("conversation write task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[tokio::test]
    async fn read_missing_returns_none() {
        let store = SqliteConversationStore::new(init_memory().unwrap());
        assert!(store.read("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read() {
        let store = SqliteConversationStore::new(init_memory().unwrap());
        let messages = vec![Message::system("prompt"), Message::user("hi")];

        store.write("u1", &messages).await.unwrap();
        assert_eq!(store.read("u1").await.unwrap(), Some(messages));
        assert!(store.read("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_preserves_other_fields() {
        let pool = init_memory().unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO conversations (user_id, document) VALUES (?1, ?2)",
                ["u1", r#"{"displayName":"Sam","messages":[]}"#],
            )
            .unwrap();
        }

        let store = SqliteConversationStore::new(pool);
        store.write("u1", &[Message::system("prompt")]).await.unwrap();

        let document = store.document("u1").unwrap().unwrap();
        assert_eq!(document["displayName"], "Sam");
        assert_eq!(document["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn unreadable_messages_read_as_none() {
        let pool = init_memory().unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO conversations (user_id, document) VALUES (?1, ?2)",
                ["u1", r#"{"messages":"garbage"}"#],
            )
            .unwrap();
        }

        let store = SqliteConversationStore::new(pool);
        assert!(store.read("u1").await.unwrap().is_none());
    }
}
