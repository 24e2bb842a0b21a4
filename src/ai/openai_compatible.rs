use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::capability::{ChatCapability, ChatReply, ProbeFuture};

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message>,
    pub temperature: f32,
}

/// Chat backend speaking the OpenAI `/chat/completions` protocol
pub struct OpenAICompatibleCapability {
    client: Client,
    model: String,
    base_url: String,
    api_key: String,
    temperature: f32,
}

impl OpenAICompatibleCapability {
    pub fn new(
        model: String,
        base_url: String,
        api_key: String,
        temperature: f32,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            "Initialized OpenAICompatibleCapability: model={}, base_url={}",
            model, base_url
        );
        Ok(Self {
            client,
            model,
            base_url,
            api_key,
            temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pull the assistant message out of a completion body
    pub fn reply_from_completion(body: &Value) -> ChatReply {
        body.pointer("/choices/0/message")
            .cloned()
            .map(ChatReply::from_value)
            .unwrap_or(ChatReply::Other(body.clone()))
    }
}

#[async_trait]
impl ChatCapability for OpenAICompatibleCapability {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn init(&self) -> Option<ProbeFuture> {
        let client = self.client.clone();
        let url = format!("{}/models", self.base_url);
        let api_key = self.api_key.clone();
        Some(Box::pin(async move {
            debug!("Checking model list at {}", url);
            client
                .get(&url)
                .bearer_auth(api_key)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        }))
    }

    async fn chat(&self, prompt: &str) -> anyhow::Result<ChatReply> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        Ok(Self::reply_from_completion(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completion_message_content_is_extracted() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "print(1)"}}]
        });
        let reply = OpenAICompatibleCapability::reply_from_completion(&body);
        assert_eq!(reply.into_text(), "print(1)");
    }

    #[test]
    fn completion_without_choices_is_empty() {
        let body = json!({"error": {"message": "quota"}});
        let reply = OpenAICompatibleCapability::reply_from_completion(&body);
        assert_eq!(reply.into_text(), "");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let capability = OpenAICompatibleCapability::new(
            "gpt-4o-mini".into(),
            "https://api.example.com/v1/".into(),
            "key".into(),
            0.2,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(capability.base_url(), "https://api.example.com/v1");
        assert!(capability.ready().is_none());
        assert!(capability.init().is_some());
    }
}
