//! Transcript Document Storage
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Document ids are generated by the store, callers only keep them
//! - Array-union merge semantics shared by every backend via `TranscriptPatch`

use crate::config::settings::{StoreBackend, StoreConfig};
use crate::core::message::Message;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod filesystem;
pub mod memory;

/// Persisted transcript of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    pub id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub timestamp: DateTime<Utc>,
}

/// Document body before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub user_id: String,
    pub messages: Vec<Message>,
    pub timestamp: DateTime<Utc>,
}

impl NewTranscript {
    pub fn into_record(self, id: String) -> TranscriptRecord {
        TranscriptRecord {
            id,
            user_id: self.user_id,
            messages: self.messages,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TranscriptPatch {
    /// Array union: messages already in the record are not added again
    AppendMessages(Vec<Message>),
}

impl TranscriptPatch {
    pub fn apply(&self, record: &mut TranscriptRecord) {
        match self {
            TranscriptPatch::AppendMessages(messages) => {
                for message in messages {
                    if !record.messages.contains(message) {
                        record.messages.push(message.clone());
                    }
                }
            }
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document and return its id
    async fn create(&self, collection: &str, doc: NewTranscript) -> Result<String, StoreError>;

    /// Merge a patch into an existing document
    async fn update(&self, collection: &str, id: &str, patch: TranscriptPatch) -> Result<(), StoreError>;

    /// All documents for a user, oldest first
    async fn query_by_user(&self, collection: &str, user_id: &str) -> Result<Vec<TranscriptRecord>, StoreError>;
}

/// Build the configured backend
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(memory::InMemoryStore::new())),
        StoreBackend::Filesystem => Ok(Arc::new(
            filesystem::FileSystemStore::new(config.path.clone()).await?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_is_array_union() {
        let mut record = NewTranscript {
            user_id: "u1".to_string(),
            messages: vec![Message::user("Hello")],
            timestamp: Utc::now(),
        }
        .into_record("doc-1".to_string());

        let patch = TranscriptPatch::AppendMessages(vec![Message::assistant("Hi there!")]);
        patch.apply(&mut record);
        patch.apply(&mut record);

        assert_eq!(
            record.messages,
            vec![Message::user("Hello"), Message::assistant("Hi there!")]
        );
    }

    #[test]
    fn test_record_field_names() {
        let record = NewTranscript {
            user_id: "u1".to_string(),
            messages: vec![],
            timestamp: Utc::now(),
        }
        .into_record("doc-1".to_string());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u1");
        assert!(json.get("timestamp").is_some());
    }
}
