//! Scripted chat backend for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::capability::{ChatCapability, ChatReply, ProbeFuture};

/// Behaviour of a `ready` or `init` signal
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    /// Resolve successfully after the delay
    ResolveAfter(Duration),
    /// Fail after the delay
    FailAfter(Duration),
    /// Never resolve
    Pending,
    /// Fail immediately the first `n` times, then resolve immediately
    FailTimes(usize),
}

pub struct ScriptedCapability {
    ready: Option<Signal>,
    init: Option<Signal>,
    reply: Result<ChatReply, String>,
    chat_delay: Duration,
    pub ready_calls: Arc<AtomicUsize>,
    pub init_calls: Arc<AtomicUsize>,
    pub chat_calls: Arc<AtomicUsize>,
}

impl ScriptedCapability {
    pub fn new() -> Self {
        Self {
            ready: None,
            init: None,
            reply: Ok(ChatReply::Text("pong".to_string())),
            chat_delay: Duration::ZERO,
            ready_calls: Arc::new(AtomicUsize::new(0)),
            init_calls: Arc::new(AtomicUsize::new(0)),
            chat_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_ready(mut self, signal: Signal) -> Self {
        self.ready = Some(signal);
        self
    }

    pub fn with_init(mut self, signal: Signal) -> Self {
        self.init = Some(signal);
        self
    }

    pub fn with_reply(mut self, reply: impl Into<ChatReply>) -> Self {
        self.reply = Ok(reply.into());
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.reply = Err(message.to_string());
        self
    }

    pub fn with_chat_delay(mut self, delay: Duration) -> Self {
        self.chat_delay = delay;
        self
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    fn signal_future(signal: Signal, calls: &Arc<AtomicUsize>) -> ProbeFuture {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match signal {
                Signal::ResolveAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
                Signal::FailAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(anyhow::anyhow!("signal failed"))
                }
                Signal::Pending => futures::future::pending().await,
                Signal::FailTimes(n) if call < n => Err(anyhow::anyhow!("not yet")),
                Signal::FailTimes(_) => Ok(()),
            }
        })
    }
}

#[async_trait]
impl ChatCapability for ScriptedCapability {
    fn name(&self) -> &str {
        "scripted"
    }

    fn ready(&self) -> Option<ProbeFuture> {
        self.ready
            .map(|signal| Self::signal_future(signal, &self.ready_calls))
    }

    fn init(&self) -> Option<ProbeFuture> {
        self.init
            .map(|signal| Self::signal_future(signal, &self.init_calls))
    }

    async fn chat(&self, _prompt: &str) -> anyhow::Result<ChatReply> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if !self.chat_delay.is_zero() {
            tokio::time::sleep(self.chat_delay).await;
        }
        self.reply.clone().map_err(|e| anyhow::anyhow!(e))
    }
}
