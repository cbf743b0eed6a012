/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across reads is held back until its
/// remaining bytes arrive. Malformed sequences are skipped rather than
/// failing the stream, so text on either side of a fault survives.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    dropped: usize,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + bytes` as is complete
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut start = 0;

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(
                        &self.pending[start..start + valid_up_to],
                    ));

                    match e.error_len() {
                        Some(bad) => {
                            tracing::warn!("[Utf8Decoder] Dropping {} malformed byte(s)", bad);
                            self.dropped += bad;
                            start += valid_up_to + bad;
                        }
                        // incomplete tail, wait for more bytes
                        None => {
                            start += valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        text
    }

    /// Flush at end of stream. A tail that can no longer be completed is
    /// dropped. Calling this again yields nothing.
    pub fn finish(&mut self) -> String {
        let text = self.decode(&[]);

        if !self.pending.is_empty() {
            tracing::warn!(
                "[Utf8Decoder] Dropping {} byte(s) of incomplete character at end of stream",
                self.pending.len()
            );
            self.dropped += self.pending.len();
            self.pending.clear();
        }

        text
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Bytes discarded as malformed or incomplete so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
