//! Transcript Reducer
//!
//! Single writer of the in-memory conversation. A turn opens an empty
//! assistant slot at the tail, fragments extend it in arrival order and
//! completion (or failure) closes it.

use crate::core::message::Message;
use crate::error::ReducerError;

/// Shown when a turn fails before any text arrived
pub const FALLBACK_REPLY: &str = "I'm sorry, but I encountered an error. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    /// Position of the open assistant message, always the last one
    Streaming(usize),
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    state: SlotState,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: SlotState::Idle,
        }
    }

    /// Start with an assistant greeting; an empty greeting is skipped
    pub fn with_greeting(greeting: &str) -> Self {
        let mut conversation = Self::new();
        if !greeting.is_empty() {
            conversation.messages.push(Message::assistant(greeting));
        }
        conversation
    }

    /// Rebuild a closed conversation, e.g. from a snapshot or the store
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            state: SlotState::Idle,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, SlotState::Streaming(_))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append the user message and open an empty assistant slot.
    /// Rejected while a slot is already open.
    pub fn submit_user(&mut self, text: &str) -> Result<&Message, ReducerError> {
        if self.is_streaming() {
            return Err(ReducerError::TurnInProgress);
        }
        if text.trim().is_empty() {
            return Err(ReducerError::EmptyMessage);
        }

        self.messages.push(Message::user(text));
        self.messages.push(Message::assistant(""));
        let slot = self.messages.len() - 1;
        self.state = SlotState::Streaming(slot);

        Ok(&self.messages[slot - 1])
    }

    /// History to send with the current turn: everything but the open slot
    pub fn request_history(&self) -> &[Message] {
        match self.state {
            SlotState::Streaming(slot) => &self.messages[..slot],
            SlotState::Idle => &self.messages,
        }
    }

    pub fn apply_fragment(&mut self, fragment: &str) -> Result<(), ReducerError> {
        match self.state {
            SlotState::Streaming(slot) => {
                self.messages[slot].content.push_str(fragment);
                Ok(())
            }
            SlotState::Idle => Err(ReducerError::NoOpenSlot),
        }
    }

    /// Close the slot; its content is final until the next turn
    pub fn complete(&mut self) -> Result<&Message, ReducerError> {
        let slot = self.close()?;
        Ok(&self.messages[slot])
    }

    /// Close the slot after a transport failure. Partial text is kept as
    /// is; only an empty slot is filled with the fallback reply.
    pub fn fail(&mut self) -> Result<&Message, ReducerError> {
        let slot = self.close()?;
        let message = &mut self.messages[slot];
        if message.content.is_empty() {
            message.content = FALLBACK_REPLY.to_string();
        }
        Ok(&self.messages[slot])
    }

    fn close(&mut self) -> Result<usize, ReducerError> {
        match self.state {
            SlotState::Streaming(slot) => {
                self.state = SlotState::Idle;
                Ok(slot)
            }
            SlotState::Idle => Err(ReducerError::NoOpenSlot),
        }
    }
}
