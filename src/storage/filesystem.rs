//! File System Document Storage
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Persistence mechanism independent of storage trait users

use super::{DocumentStore, NewTranscript, TranscriptPatch, TranscriptRecord};
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// File system store - each document is a JSON file
/// Files are stored as {base_path}/{collection}/{id}.json
pub struct FileSystemStore {
    base_path: PathBuf,
}

impl FileSystemStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(collection)
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_path(collection).join(format!("{}.json", id))
    }

    fn staging_path(path: &Path) -> PathBuf {
        path.with_extension("json.tmp")
    }

    /// Write to a sibling file and rename it over the document, so a
    /// failed write leaves the previous version intact
    async fn write(&self, path: &Path, record: &TranscriptRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(record)?;
        let staging = Self::staging_path(path);

        if let Err(e) = fs::write(&staging, json).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileSystemStore {
    async fn create(&self, collection: &str, doc: NewTranscript) -> Result<String, StoreError> {
        fs::create_dir_all(self.collection_path(collection)).await?;

        let id = Uuid::new_v4().to_string();
        let path = self.document_path(collection, &id);
        self.write(&path, &doc.into_record(id.clone())).await?;

        tracing::debug!("[FileSystemStore] Created {}/{} at {:?}", collection, id, path);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: TranscriptPatch) -> Result<(), StoreError> {
        let path = self.document_path(collection, id);

        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut record: TranscriptRecord = serde_json::from_str(&json)?;
        patch.apply(&mut record);
        self.write(&path, &record).await?;

        tracing::debug!(
            "[FileSystemStore] Updated {}/{} ({} messages)",
            collection,
            id,
            record.messages.len()
        );
        Ok(())
    }

    async fn query_by_user(&self, collection: &str, user_id: &str) -> Result<Vec<TranscriptRecord>, StoreError> {
        let dir = self.collection_path(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let json = fs::read_to_string(&path).await?;
            match serde_json::from_str::<TranscriptRecord>(&json) {
                Ok(record) if record.user_id == user_id => records.push(record),
                Ok(_) => {}
                Err(e) => tracing::warn!("[FileSystemStore] Skipping unreadable document {:?}: {}", path, e),
            }
        }

        records.sort_by_key(|r| r.timestamp);
        tracing::debug!(
            "[FileSystemStore] Found {} records for user '{}' in '{}'",
            records.len(),
            user_id,
            collection
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn transcript(user_id: &str, text: &str) -> NewTranscript {
        NewTranscript {
            user_id: user_id.to_string(),
            messages: vec![Message::user(text)],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp_dir.path().to_path_buf()).await.unwrap();

        let id = store.create("messages", transcript("u1", "Hello")).await.unwrap();
        store
            .update(
                "messages",
                &id,
                TranscriptPatch::AppendMessages(vec![Message::assistant("Hi there!")]),
            )
            .await
            .unwrap();

        let records = store.query_by_user("messages", "u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(
            records[0].messages,
            vec![Message::user("Hello"), Message::assistant("Hi there!")]
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp_dir.path().to_path_buf()).await.unwrap();

        let result = store
            .update("messages", "missing", TranscriptPatch::AppendMessages(vec![]))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_query_empty_collection() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp_dir.path().to_path_buf()).await.unwrap();

        let records = store.query_by_user("messages", "u1").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();
        let now = Utc::now();

        {
            let store = FileSystemStore::new(path.clone()).await.unwrap();
            let mut second = transcript("u1", "second");
            second.timestamp = now + Duration::seconds(1);
            let mut first = transcript("u1", "first");
            first.timestamp = now;
            store.create("messages", second).await.unwrap();
            store.create("messages", first).await.unwrap();
        }

        {
            let store = FileSystemStore::new(path).await.unwrap();
            let records = store.query_by_user("messages", "u1").await.unwrap();
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].messages[0].content, "first");
        }
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_version() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp_dir.path().to_path_buf()).await.unwrap();

        let id = store.create("messages", transcript("u1", "Hello")).await.unwrap();

        // a directory in the staging slot makes the write fail
        let document = store.document_path("messages", &id);
        fs::create_dir(FileSystemStore::staging_path(&document)).await.unwrap();

        let result = store
            .update(
                "messages",
                &id,
                TranscriptPatch::AppendMessages(vec![Message::assistant("Hi there!")]),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Io(_))));

        let records = store.query_by_user("messages", "u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].messages, vec![Message::user("Hello")]);
    }
}
