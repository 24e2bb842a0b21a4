use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::capability::{ChatCapability, ChatReply, ProbeFuture};
use super::openai_compatible::OpenAICompatibleCapability;

/// Ollama backend
/// Chats through Ollama's OpenAI-compatible `/v1` endpoint and checks
/// readiness through the native `/api/version` route.
pub struct OllamaCapability {
    inner: OpenAICompatibleCapability,
    client: Client,
    host: String,
}

impl OllamaCapability {
    pub fn new(
        model: String,
        base_url: String,
        api_key: String,
        temperature: f32,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let inner =
            OpenAICompatibleCapability::new(model, base_url, api_key, temperature, request_timeout)?;
        let host = ollama_host(inner.base_url());
        info!("Initialized OllamaCapability: host={}", host);

        Ok(Self {
            inner,
            client: Client::builder().timeout(request_timeout).build()?,
            host,
        })
    }
}

/// Strip the OpenAI-compatible suffix to get the native API host
fn ollama_host(base_url: &str) -> String {
    base_url
        .trim_end_matches('/')
        .trim_end_matches("/v1")
        .to_string()
}

#[async_trait]
impl ChatCapability for OllamaCapability {
    fn name(&self) -> &str {
        "ollama"
    }

    fn init(&self) -> Option<ProbeFuture> {
        let client = self.client.clone();
        let url = format!("{}/api/version", self.host);
        Some(Box::pin(async move {
            debug!("Checking Ollama at {}", url);
            client.get(&url).send().await?.error_for_status()?;
            Ok(())
        }))
    }

    async fn chat(&self, prompt: &str) -> anyhow::Result<ChatReply> {
        self.inner.chat(prompt).await
    }
}
