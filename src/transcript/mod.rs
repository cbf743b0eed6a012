pub mod reducer;
pub mod snapshot;
pub mod sync;

pub use reducer::{Conversation, SlotState, FALLBACK_REPLY};
pub use sync::{TranscriptSync, UserId};
