use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;

/// A readiness signal exposed by a chat backend.
pub type ProbeFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Interface for the hosted chat backend that performs the translation.
///
/// Backends may expose a `ready` signal and an `init` hook; both are optional
/// and are only used by the readiness prober.
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Provider name used in logs and the health endpoint
    fn name(&self) -> &str;

    /// Resolves once the backend reports itself usable
    fn ready(&self) -> Option<ProbeFuture> {
        None
    }

    /// Initialization hook. `None` means there is nothing to wait for.
    fn init(&self) -> Option<ProbeFuture> {
        None
    }

    /// Send one prompt and return the raw reply
    async fn chat(&self, prompt: &str) -> anyhow::Result<ChatReply>;
}

/// A single fragment of a multi-part reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplyFragment {
    #[serde(default, alias = "content")]
    pub text: Option<String>,
}

/// An object reply carrying one textual field
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplyMessage {
    #[serde(alias = "content")]
    pub text: String,
}

/// The shapes a chat backend may answer with
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Text(String),
    Fragments(Vec<ReplyFragment>),
    Message(ReplyMessage),
    Other(Value),
}

impl ChatReply {
    /// Interpret an arbitrary JSON reply. Unknown shapes become `Other`.
    ///
    /// Messages come only from objects and fragments only from arrays of
    /// objects; a sequence never fills a struct positionally.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => ChatReply::Text(text),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(ChatReply::Message)
                .unwrap_or(ChatReply::Other(value)),
            Value::Array(ref items) if items.iter().all(Value::is_object) => {
                serde_json::from_value(value.clone())
                    .map(ChatReply::Fragments)
                    .unwrap_or(ChatReply::Other(value))
            }
            other => ChatReply::Other(other),
        }
    }

    /// Flatten the reply into plain text. Unknown shapes yield an empty string.
    pub fn into_text(self) -> String {
        match self {
            ChatReply::Text(text) => text,
            ChatReply::Message(message) => message.text,
            ChatReply::Fragments(fragments) => fragments
                .into_iter()
                .filter_map(|f| f.text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            ChatReply::Other(_) => String::new(),
        }
    }
}

impl From<String> for ChatReply {
    fn from(text: String) -> Self {
        ChatReply::Text(text)
    }
}

impl From<&str> for ChatReply {
    fn from(text: &str) -> Self {
        ChatReply::Text(text.to_string())
    }
}
