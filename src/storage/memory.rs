//! In-Memory Document Storage
//!
//! Information Hiding:
//! - Nested HashMap (collection -> id -> record) hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::{DocumentStore, NewTranscript, TranscriptPatch, TranscriptRecord};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type Collections = HashMap<String, HashMap<String, TranscriptRecord>>;

/// In-memory store. Data is lost when process terminates
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, collection: &str, id: &str) -> Option<TranscriptRecord> {
        let collections = self.collections.read().await;
        collections.get(collection).and_then(|docs| docs.get(id)).cloned()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(&self, collection: &str, doc: NewTranscript) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc.into_record(id.clone()));

        tracing::debug!("[InMemoryStore] Created {}/{}", collection, id);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: TranscriptPatch) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        patch.apply(record);
        tracing::debug!(
            "[InMemoryStore] Updated {}/{} ({} messages)",
            collection,
            id,
            record.messages.len()
        );
        Ok(())
    }

    async fn query_by_user(&self, collection: &str, user_id: &str) -> Result<Vec<TranscriptRecord>, StoreError> {
        let collections = self.collections.read().await;
        let mut records: Vec<TranscriptRecord> = collections
            .get(collection)
            .map(|docs| docs.values().filter(|r| r.user_id == user_id).cloned().collect())
            .unwrap_or_default();

        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use chrono::{Duration, Utc};

    fn transcript(user_id: &str, text: &str) -> NewTranscript {
        NewTranscript {
            user_id: user_id.to_string(),
            messages: vec![Message::user(text)],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let store = InMemoryStore::new();
        let id = store.create("messages", transcript("u1", "Hello")).await.unwrap();

        store
            .update(
                "messages",
                &id,
                TranscriptPatch::AppendMessages(vec![Message::assistant("Hi there!")]),
            )
            .await
            .unwrap();

        let record = store.get("messages", &id).await.unwrap();
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.messages[1].content, "Hi there!");
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = InMemoryStore::new();
        let result = store
            .update("messages", "nope", TranscriptPatch::AppendMessages(vec![]))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_query_by_user_ordered_by_time() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut later = transcript("u1", "second");
        later.timestamp = now + Duration::seconds(5);
        let mut earlier = transcript("u1", "first");
        earlier.timestamp = now;

        store.create("messages", later).await.unwrap();
        store.create("messages", earlier).await.unwrap();
        store.create("messages", transcript("u2", "other")).await.unwrap();

        let records = store.query_by_user("messages", "u1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].messages[0].content, "first");
        assert_eq!(records[1].messages[0].content, "second");
    }
}
