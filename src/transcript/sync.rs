//! Transcript Store Sync
//!
//! Two writes per turn: the record is created with the user message
//! before the relay call, then updated once with the final assistant
//! message. Failures are logged and swallowed; the in-memory
//! conversation stays authoritative and a record left holding only the
//! user message is not repaired.

use crate::core::message::Message;
use crate::error::StoreError;
use crate::storage::{DocumentStore, NewTranscript, TranscriptPatch, TranscriptRecord};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// Stable identifier supplied by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct TranscriptSync {
    store: Arc<dyn DocumentStore>,
    collection: String,
    user_id: UserId,
}

impl TranscriptSync {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, user_id: UserId) -> Self {
        Self {
            store,
            collection: collection.into(),
            user_id,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Optimistic create. Returns the record id, or `None` if the write failed.
    pub async fn begin_turn(&self, user_message: &Message) -> Option<String> {
        let doc = NewTranscript {
            user_id: self.user_id.to_string(),
            messages: vec![user_message.clone()],
            timestamp: Utc::now(),
        };

        match self.store.create(&self.collection, doc).await {
            Ok(id) => {
                tracing::debug!("[TranscriptSync] Created record {} for user {}", id, self.user_id);
                Some(id)
            }
            Err(e) => {
                tracing::error!(
                    "[TranscriptSync] Failed to create record for user {}: {}",
                    self.user_id,
                    e
                );
                None
            }
        }
    }

    /// Append the finalized assistant message to the turn's record.
    /// Returns whether the record now holds it.
    pub async fn finish_turn(&self, record_id: Option<&str>, assistant_message: &Message) -> bool {
        let Some(id) = record_id else {
            tracing::warn!("[TranscriptSync] No record for this turn, assistant message not persisted");
            return false;
        };

        let patch = TranscriptPatch::AppendMessages(vec![assistant_message.clone()]);
        match self.store.update(&self.collection, id, patch).await {
            Ok(()) => {
                tracing::debug!("[TranscriptSync] Updated record {}", id);
                true
            }
            Err(e) => {
                tracing::error!(
                    "[TranscriptSync] Failed to update record {}, it keeps only the user message: {}",
                    id,
                    e
                );
                false
            }
        }
    }

    /// The user's records, oldest first
    pub async fn history(&self) -> Result<Vec<TranscriptRecord>, StoreError> {
        self.store.query_by_user(&self.collection, self.user_id.as_str()).await
    }
}
