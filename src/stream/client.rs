use super::fragments::FragmentStream;
use crate::core::message::Message;
use crate::error::StreamError;
use async_trait::async_trait;
use reqwest::Client;

/// Opens a streamed reply for a conversation history
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, history: &[Message]) -> Result<FragmentStream, StreamError>;
}

/// HTTP client for the relay's `/api/chat` endpoint
pub struct RelayClient {
    client: Client,
    relay_url: String,
}

impl RelayClient {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            relay_url: relay_url.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for RelayClient {
    async fn open(&self, history: &[Message]) -> Result<FragmentStream, StreamError> {
        tracing::debug!("[RelayClient] Posting {} messages to {}", history.len(), self.relay_url);

        let response = self.client.post(&self.relay_url).json(history).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("[RelayClient] Relay returned status {}", status);
            return Err(StreamError::Status(status.as_u16()));
        }

        Ok(FragmentStream::new(response.bytes_stream()))
    }
}
