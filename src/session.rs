//! Chat Session - one user's turns against the relay
//!
//! Information Hiding:
//! - Reducer, persistence and snapshot ordering handled internally
//! - Transport failures become a terminal assistant message, never retried
//! - Persistence failures are logged, never surfaced to the chat

use crate::core::message::Message;
use crate::error::{ReducerError, StoreError, StreamError};
use crate::stream::ChatTransport;
use crate::transcript::{snapshot, Conversation, TranscriptSync};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;

/// Terminal state of one turn
#[derive(Debug)]
pub enum TurnOutcome {
    Completed { reply: String, persisted: bool },
    Failed { reply: String, error: StreamError },
}

impl TurnOutcome {
    pub fn reply(&self) -> &str {
        match self {
            TurnOutcome::Completed { reply, .. } | TurnOutcome::Failed { reply, .. } => reply,
        }
    }
}

pub struct ChatSession {
    conversation: Conversation,
    transport: Arc<dyn ChatTransport>,
    sync: TranscriptSync,
    snapshot_path: Option<PathBuf>,
}

impl ChatSession {
    pub fn new(conversation: Conversation, transport: Arc<dyn ChatTransport>, sync: TranscriptSync) -> Self {
        Self {
            conversation,
            transport,
            sync,
            snapshot_path: None,
        }
    }

    /// Rebuild the conversation from the user's stored transcripts,
    /// falling back to `greeting` when there are none.
    pub async fn resume(
        transport: Arc<dyn ChatTransport>,
        sync: TranscriptSync,
        greeting: &str,
    ) -> Result<Self, StoreError> {
        let records = sync.history().await?;
        let conversation = if records.is_empty() {
            Conversation::with_greeting(greeting)
        } else {
            let messages: Vec<Message> = records.into_iter().flat_map(|r| r.messages).collect();
            tracing::info!("[ChatSession] Resumed {} messages for user {}", messages.len(), sync.user_id());
            Conversation::from_messages(messages)
        };

        Ok(Self::new(conversation, transport, sync))
    }

    /// Mirror the conversation to a local snapshot after every turn
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run one turn. `on_fragment` sees each fragment as it is applied.
    /// Only reducer violations are errors; transport failures end the
    /// turn with `TurnOutcome::Failed`. Dropping the future mid-turn
    /// closes the open slot and drops the relay connection.
    pub async fn send(
        &mut self,
        text: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<TurnOutcome, ReducerError> {
        let user_message = self.conversation.submit_user(text)?.clone();
        let mut turn = OpenTurn {
            conversation: &mut self.conversation,
        };
        let record_id = self.sync.begin_turn(&user_message).await;

        let opened = self.transport.open(turn.conversation.request_history()).await;
        let streamed = match opened {
            Ok(mut fragments) => loop {
                match fragments.next().await {
                    Some(Ok(fragment)) => {
                        turn.conversation.apply_fragment(&fragment)?;
                        on_fragment(fragment.as_str());
                    }
                    Some(Err(e)) => break Err(e),
                    None => break Ok(()),
                }
            },
            Err(e) => Err(e),
        };

        let outcome = match streamed {
            Ok(()) => {
                let reply = turn.conversation.complete()?.clone();
                let persisted = self.sync.finish_turn(record_id.as_deref(), &reply).await;
                TurnOutcome::Completed {
                    reply: reply.content,
                    persisted,
                }
            }
            Err(error) => {
                tracing::error!("[ChatSession] Turn failed: {}", error);
                let reply = turn.conversation.fail()?.content.clone();
                TurnOutcome::Failed { reply, error }
            }
        };
        drop(turn);

        self.save_snapshot().await;
        Ok(outcome)
    }

    async fn save_snapshot(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(e) = snapshot::save(path, &self.conversation).await {
            tracing::warn!("[ChatSession] Failed to write snapshot {:?}: {}", path, e);
        }
    }
}

/// Closes the open slot if a turn is abandoned before it finishes
struct OpenTurn<'a> {
    conversation: &'a mut Conversation,
}

impl Drop for OpenTurn<'_> {
    fn drop(&mut self) {
        if self.conversation.is_streaming() {
            tracing::warn!("[ChatSession] Turn cancelled before the reply finished");
            let _ = self.conversation.fail();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use crate::storage::{DocumentStore, NewTranscript, TranscriptPatch, TranscriptRecord};
    use crate::stream::FragmentStream;
    use crate::transcript::{UserId, FALLBACK_REPLY};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Chunk {
        Data(&'static [u8]),
        Reset,
    }

    struct ScriptedTransport {
        chunks: Mutex<Option<Vec<Chunk>>>,
        refuse: bool,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedTransport {
        fn new(chunks: Vec<Chunk>) -> Arc<Self> {
            Arc::new(Self {
                chunks: Mutex::new(Some(chunks)),
                refuse: false,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn refusing() -> Arc<Self> {
            Arc::new(Self {
                chunks: Mutex::new(None),
                refuse: true,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open(&self, history: &[Message]) -> Result<FragmentStream, StreamError> {
            self.seen.lock().unwrap().push(history.to_vec());
            if self.refuse {
                return Err(StreamError::Transport("connection refused".to_string()));
            }
            let chunks = self.chunks.lock().unwrap().take().unwrap_or_default();
            let items: Vec<Result<Bytes, StreamError>> = chunks
                .into_iter()
                .map(|c| match c {
                    Chunk::Data(bytes) => Ok(Bytes::from_static(bytes)),
                    Chunk::Reset => Err(StreamError::Transport("connection reset".to_string())),
                })
                .collect();
            Ok(FragmentStream::new(futures::stream::iter(items)))
        }
    }

    /// Sends one fragment, then never finishes
    struct StallingTransport;

    #[async_trait]
    impl ChatTransport for StallingTransport {
        async fn open(&self, _history: &[Message]) -> Result<FragmentStream, StreamError> {
            let bytes = futures::stream::iter(vec![Ok::<_, StreamError>(Bytes::from_static(b"Hi"))])
                .chain(futures::stream::pending());
            Ok(FragmentStream::new(bytes))
        }
    }

    /// Every write fails
    struct UnwritableStore;

    #[async_trait]
    impl DocumentStore for UnwritableStore {
        async fn create(&self, _collection: &str, _doc: NewTranscript) -> Result<String, StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }

        async fn update(&self, _collection: &str, _id: &str, _patch: TranscriptPatch) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }

        async fn query_by_user(&self, _collection: &str, _user_id: &str) -> Result<Vec<TranscriptRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn sync_for(store: &InMemoryStore) -> TranscriptSync {
        TranscriptSync::new(Arc::new(store.clone()), "messages", UserId::new("u1"))
    }

    #[tokio::test]
    async fn test_completed_turn_is_persisted() {
        let store = InMemoryStore::new();
        let transport = ScriptedTransport::new(vec![
            Chunk::Data(b"Hi"),
            Chunk::Data(b" there"),
            Chunk::Data(b"!"),
        ]);
        let mut session = ChatSession::new(Conversation::new(), transport.clone(), sync_for(&store));

        let mut seen = Vec::new();
        let outcome = session.send("Hello", |f| seen.push(f.to_string())).await.unwrap();

        assert!(matches!(&outcome, TurnOutcome::Completed { persisted: true, .. }));
        assert_eq!(outcome.reply(), "Hi there!");
        assert_eq!(seen, vec!["Hi", " there", "!"]);
        assert_eq!(transport.seen.lock().unwrap()[0], vec![Message::user("Hello")]);

        let records = store.query_by_user("messages", "u1").await.unwrap();
        assert_eq!(
            records[0].messages,
            vec![Message::user("Hello"), Message::assistant("Hi there!")]
        );
    }

    #[tokio::test]
    async fn test_split_character_across_chunks() {
        let store = InMemoryStore::new();
        let transport = ScriptedTransport::new(vec![
            Chunk::Data(b"5 \xE2"),
            Chunk::Data(b"\x82\xAC"),
        ]);
        let mut session = ChatSession::new(Conversation::new(), transport, sync_for(&store));

        let outcome = session.send("price?", |_| {}).await.unwrap();
        assert_eq!(outcome.reply(), "5 €");
    }

    #[tokio::test]
    async fn test_reset_mid_stream_keeps_partial_text() {
        let store = InMemoryStore::new();
        let transport = ScriptedTransport::new(vec![Chunk::Data(b"Hi th"), Chunk::Reset]);
        let mut session = ChatSession::new(Conversation::new(), transport, sync_for(&store));

        let outcome = session.send("Hello", |_| {}).await.unwrap();

        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        assert_eq!(outcome.reply(), "Hi th");
        assert_eq!(session.conversation().len(), 2);
        assert!(!session.conversation().is_streaming());

        let records = store.query_by_user("messages", "u1").await.unwrap();
        assert_eq!(records[0].messages, vec![Message::user("Hello")]);
    }

    #[tokio::test]
    async fn test_refused_connection_uses_fallback() {
        let store = InMemoryStore::new();
        let mut session = ChatSession::new(
            Conversation::new(),
            ScriptedTransport::refusing(),
            sync_for(&store),
        );

        let outcome = session.send("Hello", |_| {}).await.unwrap();

        assert_eq!(outcome.reply(), FALLBACK_REPLY);
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_resume_rebuilds_conversation() {
        let store = InMemoryStore::new();
        {
            let transport = ScriptedTransport::new(vec![Chunk::Data(b"Hey")]);
            let mut session = ChatSession::new(Conversation::new(), transport, sync_for(&store));
            session.send("Hello", |_| {}).await.unwrap();
        }

        let transport = ScriptedTransport::new(vec![]);
        let session = ChatSession::resume(transport, sync_for(&store), "Hi!").await.unwrap();

        assert_eq!(
            session.conversation().messages(),
            &[Message::user("Hello"), Message::assistant("Hey")]
        );
    }

    #[tokio::test]
    async fn test_resume_without_history_uses_greeting() {
        let store = InMemoryStore::new();
        let session = ChatSession::resume(ScriptedTransport::new(vec![]), sync_for(&store), "Hi!")
            .await
            .unwrap();

        assert_eq!(session.conversation().messages(), &[Message::assistant("Hi!")]);
    }

    #[tokio::test]
    async fn test_abandoned_turn_closes_slot() {
        let store = InMemoryStore::new();
        let mut session = ChatSession::new(Conversation::new(), Arc::new(StallingTransport), sync_for(&store));

        let first = tokio::time::timeout(Duration::from_millis(100), session.send("Hello", |_| {})).await;
        assert!(first.is_err());
        assert!(!session.conversation().is_streaming());
        assert_eq!(session.conversation().messages()[1].content, "Hi");

        // the next turn is accepted and stalls on the stream again
        let second = tokio::time::timeout(Duration::from_millis(100), session.send("Again", |_| {})).await;
        assert!(second.is_err());
        assert_eq!(session.conversation().len(), 4);
        assert!(!session.conversation().is_streaming());
    }

    #[tokio::test]
    async fn test_failed_create_still_completes_turn() {
        let sync = TranscriptSync::new(Arc::new(UnwritableStore), "messages", UserId::new("u1"));
        let transport = ScriptedTransport::new(vec![Chunk::Data(b"Hi"), Chunk::Data(b" there!")]);
        let mut session = ChatSession::new(Conversation::new(), transport, sync);

        let outcome = session.send("Hello", |_| {}).await.unwrap();

        assert!(matches!(&outcome, TurnOutcome::Completed { persisted: false, .. }));
        assert_eq!(outcome.reply(), "Hi there!");
        assert_eq!(
            session.conversation().messages(),
            &[Message::user("Hello"), Message::assistant("Hi there!")]
        );
    }
}
