//! Stream Consumer
//!
//! Information Hiding:
//! - Byte-level UTF-8 reassembly hidden inside `Utf8Decoder`
//! - Per-request lifecycle tracked by `StreamSession`
//! - Callers pull whole text fragments from `FragmentStream`

pub mod client;
pub mod decoder;
pub mod fragments;
pub mod session;

pub use client::{ChatTransport, RelayClient};
pub use decoder::Utf8Decoder;
pub use fragments::FragmentStream;
pub use session::{StreamSession, StreamState};
