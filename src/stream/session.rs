use super::decoder::Utf8Decoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Pending,
    Streaming,
    Completed,
    Failed,
}

/// Ephemeral state of one relay response: undecoded bytes, the text
/// produced so far and where the stream is in its lifecycle.
#[derive(Debug)]
pub struct StreamSession {
    decoder: Utf8Decoder,
    accumulated: String,
    state: StreamState,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            accumulated: String::new(),
            state: StreamState::Pending,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, StreamState::Completed | StreamState::Failed)
    }

    pub fn text(&self) -> &str {
        &self.accumulated
    }

    /// Feed a chunk, returning whatever decoded completely.
    /// Ignored once the session has reached a terminal state.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> String {
        if self.is_terminal() {
            return String::new();
        }
        if self.state == StreamState::Pending && !bytes.is_empty() {
            self.state = StreamState::Streaming;
        }

        let text = self.decoder.decode(bytes);
        self.accumulated.push_str(&text);
        text
    }

    /// Provider end-of-stream. Returns the flushed tail, if any.
    pub fn complete(&mut self) -> String {
        if self.is_terminal() {
            return String::new();
        }
        let tail = self.decoder.finish();
        self.accumulated.push_str(&tail);
        self.state = StreamState::Completed;
        tail
    }

    /// Transport failure. Bytes still pending can never complete.
    pub fn fail(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.decoder.finish();
        self.state = StreamState::Failed;
    }
}
