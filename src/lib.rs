//! Chatrelay - streaming chat relay and transcript reconciliation
//!
//! The relay forwards a conversation to a completion provider and streams
//! the reply back as raw UTF-8 bytes. The client side decodes that stream
//! into fragments, grows a single open assistant message and persists the
//! turn as a transcript record.

pub mod config;
pub mod core;
pub mod error;
pub mod relay;
pub mod session;
pub mod storage;
pub mod stream;
pub mod transcript;

pub mod cli;
pub mod utils;

pub use crate::config::Settings;
pub use crate::core::message::{Message, Role};
pub use crate::core::provider::{CompletionProvider, OpenAiProvider};
pub use relay::RelayServer;
pub use session::{ChatSession, TurnOutcome};
pub use stream::{ChatTransport, FragmentStream, RelayClient};
pub use transcript::{Conversation, TranscriptSync, UserId};
