//! Streaming completion provider
//!
//! Speaks the OpenAI-compatible `chat/completions` protocol with
//! `stream: true` and exposes the reply as a stream of text deltas.
//! No retries: a half-generated reply cannot be resumed mid-token.

use crate::config::settings::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Wire message sent to the provider, system role included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

impl From<&crate::core::message::Message> for ChatMessage {
    fn from(message: &crate::core::message::Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Ordered, finite sequence of deltas for one completion
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streaming completion. Errors before the first delta are
    /// returned here, later ones are yielded by the stream and end it.
    async fn stream_completion(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, PartialEq)]
enum SseData {
    Delta(String),
    Done,
    Empty,
}

/// Splits a server-sent-event byte stream into `data:` payloads.
/// Lines may straddle network chunks, so bytes are held until a newline.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(data) = Self::data_of(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Last line when the connection closes without a trailing newline
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        Self::data_of(&line)
    }

    fn data_of(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        line.strip_prefix("data:").map(|d| d.trim_start().to_string())
    }
}

fn parse_data(data: &str) -> Result<SseData, ProviderError> {
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Remote(error.message));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map(SseData::Delta)
        .unwrap_or(SseData::Empty))
}

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn stream_completion(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream, ProviderError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("[OpenAiProvider] API returned error status {}: {}", status, body);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("[OpenAiProvider] Streaming completion from {}", self.config.model);

        let mut bytes = Box::pin(response.bytes_stream());

        Ok(Box::pin(async_stream::stream! {
            let mut lines = SseLineBuffer::default();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ProviderError::Http(e));
                        return;
                    }
                };

                for data in lines.push(&chunk) {
                    match parse_data(&data) {
                        Ok(SseData::Delta(text)) => yield Ok(text),
                        Ok(SseData::Done) => return,
                        Ok(SseData::Empty) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            if let Some(data) = lines.finish() {
                match parse_data(&data) {
                    Ok(SseData::Delta(text)) => yield Ok(text),
                    Ok(_) => {}
                    Err(e) => yield Err(e),
                }
            }
        }))
    }
}
