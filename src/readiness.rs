use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::ai::ChatCapability;
use crate::config::ProbeConfig;

const PING_PROMPT: &str = "ping";
const PING_TIMEOUT_CAP: Duration = Duration::from_millis(5000);
const BACKOFF_BASE_MS: u64 = 2000;
const BACKOFF_CAP_MS: u64 = 8000;

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub max_attempts: u32,
    pub base_timeout: Duration,
    pub allow_active_probe: bool,
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_timeout: Duration::from_millis(config.base_timeout_ms),
            allow_active_probe: config.allow_active_probe,
        }
    }
}

/// Timeout for attempt `attempt`: grows by half the base each retry
pub fn attempt_timeout(base: Duration, attempt: u32) -> Duration {
    base.mul_f64(1.0 + attempt as f64 * 0.5)
}

/// Sleep after failed attempt `attempt`: `min(2000 * 2^attempt, 8000)` ms
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(factor).min(BACKOFF_CAP_MS))
}

async fn await_signal<F>(label: &str, signal: F, timeout: Duration) -> bool
where
    F: Future<Output = anyhow::Result<()>>,
{
    match tokio::time::timeout(timeout, signal).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("{} signal failed: {}", label, e);
            false
        }
        Err(_) => {
            debug!("{} signal timed out after {:?}", label, timeout);
            false
        }
    }
}

async fn probe_attempt(
    capability: &dyn ChatCapability,
    timeout: Duration,
    allow_active_probe: bool,
) -> bool {
    if let Some(ready) = capability.ready() {
        if await_signal("ready", ready, timeout).await {
            return true;
        }
    }

    if let Some(init) = capability.init() {
        if await_signal("init", init, timeout).await {
            return true;
        }
    }

    if allow_active_probe {
        let ping = async { capability.chat(PING_PROMPT).await.map(|_| ()) };
        if await_signal("ping", ping, timeout.min(PING_TIMEOUT_CAP)).await {
            return true;
        }
    }

    false
}

/// Decide whether the chat backend is usable.
///
/// Each attempt tries the backend's `ready` signal, then its `init` hook, then
/// (when enabled) a live ping, stopping at the first success. Failed attempts
/// back off before the next one. An absent backend is never ready.
pub async fn probe_readiness(
    capability: Option<&dyn ChatCapability>,
    settings: &ProbeSettings,
) -> bool {
    let Some(capability) = capability else {
        warn!("No chat backend available; skipping readiness probe");
        return false;
    };

    for attempt in 0..settings.max_attempts {
        let timeout = attempt_timeout(settings.base_timeout, attempt);
        debug!(
            "Readiness attempt {}/{} for {} (timeout {:?})",
            attempt + 1,
            settings.max_attempts,
            capability.name(),
            timeout
        );

        if probe_attempt(capability, timeout, settings.allow_active_probe).await {
            info!("Chat backend {} is ready", capability.name());
            return true;
        }

        if attempt + 1 < settings.max_attempts {
            let delay = backoff_delay(attempt);
            debug!("Readiness attempt {} failed, retrying in {:?}", attempt + 1, delay);
            tokio::time::sleep(delay).await;
        }
    }

    warn!(
        "Chat backend {} not ready after {} attempts; conversion disabled",
        capability.name(),
        settings.max_attempts
    );
    false
}

/// Process-wide readiness flag.
///
/// Starts false, flips to true on the first successful probe and never goes
/// back. Observers get changes through `subscribe`.
pub struct ReadinessState {
    ready: watch::Sender<bool>,
    probing: AtomicBool,
}

impl ReadinessState {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            ready,
            probing: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn is_probing(&self) -> bool {
        self.probing.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }

    /// Run the probe unless already ready or another probe is in flight.
    /// Returns the readiness afterwards.
    pub async fn run_probe(
        &self,
        capability: Option<&dyn ChatCapability>,
        settings: &ProbeSettings,
    ) -> bool {
        if self.is_ready() {
            return true;
        }
        if self.probing.swap(true, Ordering::AcqRel) {
            debug!("Readiness probe already in flight");
            return self.is_ready();
        }

        let ready = probe_readiness(capability, settings).await;
        if ready {
            self.mark_ready();
        }
        self.probing.store(false, Ordering::Release);
        ready
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}
