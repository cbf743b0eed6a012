//! Local conversation snapshot
//!
//! Versioned JSON mirror of a closed conversation. Anything that does not
//! match the current schema loads as an empty conversation.

use super::reducer::Conversation;
use crate::core::message::Message;
use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

pub fn encode(conversation: &Conversation) -> Result<String, SnapshotError> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        messages: conversation.messages().to_vec(),
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

pub fn decode(json: &str) -> Conversation {
    match serde_json::from_str::<VersionProbe>(json) {
        Ok(VersionProbe {
            version: Some(SNAPSHOT_VERSION),
        }) => {}
        Ok(probe) => {
            tracing::warn!("[Snapshot] Unsupported version {:?}, starting empty", probe.version);
            return Conversation::new();
        }
        Err(e) => {
            tracing::warn!("[Snapshot] Unreadable snapshot, starting empty: {}", e);
            return Conversation::new();
        }
    }

    match serde_json::from_str::<Snapshot>(json) {
        Ok(snapshot) => Conversation::from_messages(snapshot.messages),
        Err(e) => {
            tracing::warn!("[Snapshot] Invalid snapshot contents, starting empty: {}", e);
            Conversation::new()
        }
    }
}

/// Write the snapshot. Returns `false` without writing while a turn is open.
pub async fn save(path: &Path, conversation: &Conversation) -> Result<bool, SnapshotError> {
    if conversation.is_streaming() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, encode(conversation)?).await?;

    tracing::debug!("[Snapshot] Saved {} messages to {:?}", conversation.len(), path);
    Ok(true)
}

/// Missing or unreadable snapshots load as an empty conversation
pub async fn load(path: &Path) -> Conversation {
    match fs::read_to_string(path).await {
        Ok(json) => decode(&json),
        Err(e) => {
            tracing::debug!("[Snapshot] No snapshot at {:?}: {}", path, e);
            Conversation::new()
        }
    }
}
