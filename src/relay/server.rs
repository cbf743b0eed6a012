use crate::config::Settings;
use crate::core::message::Message;
use crate::core::provider::{ChatMessage, CompletionProvider, DeltaStream};
use crate::error::ProviderError;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, Response, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct RelayState {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: Arc<str>,
}

impl RelayState {
    pub fn new(provider: Arc<dyn CompletionProvider>, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
        }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

pub struct RelayServer {
    addr: String,
    state: RelayState,
}

impl RelayServer {
    pub fn new(settings: &Settings, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            addr: format!("{}:{}", settings.server.host, settings.server.port),
            state: RelayState::new(provider, settings.provider.system_prompt.as_str()),
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind relay on {}", self.addr))?;
        self.serve(listener, shutdown).await
    }

    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!("[Relay] Listening on {}", addr);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("[Relay] Shutting down");
            })
            .await
            .context("Relay server failed")?;

        Ok(())
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(
    State(state): State<RelayState>,
    Json(history): Json<Vec<Message>>,
) -> Result<Response<Body>, (StatusCode, String)> {
    tracing::debug!("[Relay] Chat request with {} messages", history.len());

    let messages = prompt_messages(&state.system_prompt, &history);
    let deltas = state.provider.stream_completion(messages).await.map_err(|e| {
        tracing::error!("[Relay] Provider request failed: {}", e);
        (StatusCode::BAD_GATEWAY, "Completion provider unavailable".to_string())
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(relay_body(deltas)))
        .map_err(|e| {
            tracing::error!("[Relay] Failed to build response: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build response".to_string())
        })
}

/// System directive first, then the conversation in order
fn prompt_messages(system_prompt: &str, history: &[Message]) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage::system(system_prompt))
        .chain(history.iter().map(ChatMessage::from))
        .collect()
}

/// Forward each delta as its own chunk. A provider error ends the body
/// with an error so the connection aborts instead of closing cleanly.
fn relay_body(mut deltas: DeltaStream) -> impl Stream<Item = Result<Bytes, ProviderError>> + Send {
    async_stream::stream! {
        let mut forwarded = 0usize;

        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) => {
                    forwarded += 1;
                    yield Ok(Bytes::from(text));
                }
                Err(e) => {
                    tracing::error!("[Relay] Provider failed after {} deltas: {}", forwarded, e);
                    // let the connection flush forwarded chunks before the abort
                    tokio::task::yield_now().await;
                    yield Err(e);
                    return;
                }
            }
        }

        tracing::debug!("[Relay] Stream completed after {} deltas", forwarded);
    }
}
