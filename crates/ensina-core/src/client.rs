use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ChatError;

pub const DEFAULT_BASE_URL: &str = "https://ensina-api.onrender.com";

/// Raw response body of a chat request
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// The remote completion service.
///
/// Implementations must be cancel safe: dropping a returned future or
/// [`ByteStream`] abandons the request.
#[async_trait]
pub trait CompletionService: Send + Sync + 'static {
    /// Clear any conversation state the service keeps for this client.
    async fn reset(&self) -> Result<(), ChatError>;

    /// Send one user message, returning the streamed reply body.
    async fn open_chat(&self, message: &str) -> Result<ByteStream, ChatError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionService for ChatClient {
    async fn reset(&self) -> Result<(), ChatError> {
        let url = format!("{}/api/reset", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(rejected(response.status()));
        }

        Ok(())
    }

    async fn open_chat(&self, message: &str) -> Result<ByteStream, ChatError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "text/event-stream")
            .json(&ChatRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response.status()));
        }

        let body = response.bytes_stream().map(|chunk| chunk.map_err(ChatError::from));
        Ok(Box::pin(body))
    }
}

fn rejected(status: reqwest::StatusCode) -> ChatError {
    ChatError::Rejected {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("unknown status").to_string(),
    }
}

/// Fire-and-forget reset at startup. Failures are logged, never surfaced.
pub fn reset_in_background<S: CompletionService>(service: Arc<S>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match service.reset().await {
            Ok(()) => info!("conversation reset on server"),
            Err(e) => warn!(error = %e, "failed to reset conversation on server"),
        }
    })
}
