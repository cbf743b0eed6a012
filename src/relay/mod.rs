//! Relay Server
//!
//! Information Hiding:
//! - Provider protocol and credentials hidden behind `CompletionProvider`
//! - System directive prepended here, callers only send the conversation
//! - Response is raw UTF-8 bytes, one body chunk per provider delta

pub mod server;

pub use server::{router, RelayServer, RelayState};
