use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ai::ChatCapability;
use crate::error::ConvertError;
use crate::languages::find_language;
use crate::prompt::build_prompt;
use crate::readiness::ReadinessState;
use crate::sanitize::{has_dangerous_shell, strip_fences, truncate_output};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    #[serde(alias = "sourceLanguage")]
    pub source_language: String,
    #[serde(alias = "targetLanguage")]
    pub target_language: String,
    #[serde(alias = "sourceText", alias = "code")]
    pub source_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub display_text: String,
    pub truncated: bool,
    /// Advisory only; the text is still displayed
    pub dangerous_shell: bool,
}

/// Busy flag allowing at most one conversion in flight
#[derive(Debug, Default)]
pub struct ConversionGate {
    busy: AtomicBool,
}

/// Holds the gate closed until dropped
pub struct GateGuard {
    gate: Arc<ConversionGate>,
}

impl ConversionGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<GateGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { gate: self.clone() })
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

/// Turns source snippets into target-language code through the chat backend
pub struct CodeConverter {
    capability: Option<Arc<dyn ChatCapability>>,
    readiness: Arc<ReadinessState>,
    max_output_chars: usize,
}

impl CodeConverter {
    pub fn new(
        capability: Option<Arc<dyn ChatCapability>>,
        readiness: Arc<ReadinessState>,
        max_output_chars: usize,
    ) -> Self {
        Self {
            capability,
            readiness,
            max_output_chars,
        }
    }

    /// Validate a request and claim the gate. Nothing is sent to the backend
    /// yet; the returned conversion holds the gate until it finishes or is
    /// dropped.
    pub fn begin(
        &self,
        gate: &Arc<ConversionGate>,
        request: &ConversionRequest,
    ) -> Result<PendingConversion, ConvertError> {
        if request.source_text.trim().is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        let source = find_language(&request.source_language)
            .ok_or_else(|| ConvertError::UnsupportedLanguage(request.source_language.clone()))?;
        let target = find_language(&request.target_language)
            .ok_or_else(|| ConvertError::UnsupportedLanguage(request.target_language.clone()))?;

        if !self.readiness.is_ready() {
            return Err(ConvertError::NotReady);
        }
        let capability = self.capability.clone().ok_or(ConvertError::NotReady)?;
        let guard = gate.try_acquire().ok_or(ConvertError::Busy)?;

        info!(
            "Converting {} chars from {} to {}",
            request.source_text.len(),
            source.name,
            target.name
        );
        Ok(PendingConversion {
            capability,
            prompt: build_prompt(source.name, target.name, &request.source_text),
            max_output_chars: self.max_output_chars,
            _guard: guard,
        })
    }

    /// Run one conversion. Issues exactly one chat call on the happy path and
    /// none when the request is rejected up front. Failures are not retried.
    pub async fn convert(
        &self,
        gate: &Arc<ConversionGate>,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConvertError> {
        self.begin(gate, request)?.run().await
    }
}

/// An accepted conversion that owns its slot on the gate
pub struct PendingConversion {
    capability: Arc<dyn ChatCapability>,
    prompt: String,
    max_output_chars: usize,
    _guard: GateGuard,
}

impl PendingConversion {
    pub async fn run(self) -> Result<ConversionResult, ConvertError> {
        let reply = self.capability.chat(&self.prompt).await.map_err(|e| {
            error!("Chat request to {} failed: {}", self.capability.name(), e);
            ConvertError::RequestFailure(e.to_string())
        })?;

        finish(&reply.into_text(), self.max_output_chars)
    }
}

/// Sanitize a raw reply into a displayable result
fn finish(raw: &str, max_output_chars: usize) -> Result<ConversionResult, ConvertError> {
    if raw.trim().is_empty() {
        warn!("Chat backend returned an empty reply");
        return Err(ConvertError::EmptyResponse);
    }

    let code = strip_fences(raw);
    if code.is_empty() {
        warn!("Chat reply contained only fence markers");
        return Err(ConvertError::EmptyResponse);
    }

    let dangerous_shell = has_dangerous_shell(&code);
    if dangerous_shell {
        warn!("Converted code contains potentially dangerous shell commands");
    }

    let truncated = code.chars().count() > max_output_chars;
    let display_text = truncate_output(&code, max_output_chars);
    info!(
        "Conversion finished: {} chars{}",
        display_text.len(),
        if truncated { " (truncated)" } else { "" }
    );

    Ok(ConversionResult {
        display_text,
        truncated,
        dangerous_shell,
    })
}
