use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::capability::ChatCapability;
use super::ollama::OllamaCapability;
use super::openai_compatible::OpenAICompatibleCapability;
use crate::config::AiConfig;

/// Factory for creating chat backends
pub struct CapabilityFactory;

impl CapabilityFactory {
    /// Create the configured backend.
    ///
    /// Returns `Ok(None)` for the `none` provider; the service then runs in
    /// degraded mode with conversion disabled.
    pub fn create(config: &AiConfig) -> Result<Option<Arc<dyn ChatCapability>>> {
        info!("Initializing chat backend: {}", config.provider);

        match config.provider.as_str() {
            "openai_compatible" | "openai" | "deepseek" | "groq" | "mistral" => {
                Ok(Some(Arc::new(OpenAICompatibleCapability::new(
                    config.model.clone(),
                    config.base_url.clone(),
                    config.api_key.clone(),
                    config.temperature,
                    config.request_timeout(),
                )?)))
            }
            "ollama" => Ok(Some(Arc::new(OllamaCapability::new(
                config.model.clone(),
                config.base_url.clone(),
                if config.api_key.is_empty() {
                    "ollama".to_string()
                } else {
                    config.api_key.clone()
                },
                config.temperature,
                config.request_timeout(),
            )?))),
            "none" | "" => {
                warn!("No chat backend configured; conversion will stay disabled");
                Ok(None)
            }
            other => Err(anyhow::anyhow!("Unsupported chat provider: {}", other)),
        }
    }
}
