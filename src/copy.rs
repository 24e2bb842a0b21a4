use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::error::ConvertError;

/// How long the "copied" indicator stays on
pub const COPIED_RESET_DELAY: Duration = Duration::from_millis(1500);

/// Destination for copied text
#[async_trait]
pub trait ClipboardSink: Send + Sync {
    async fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Transient "copied" flag. Each successful copy turns it on and schedules a
/// reset; earlier timers are left running since they all reset to `false`.
#[derive(Clone)]
pub struct CopyIndicator {
    copied: Arc<watch::Sender<bool>>,
}

impl CopyIndicator {
    pub fn new() -> Self {
        let (copied, _) = watch::channel(false);
        Self {
            copied: Arc::new(copied),
        }
    }

    pub fn is_copied(&self) -> bool {
        *self.copied.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.copied.subscribe()
    }

    fn flash(&self) {
        self.copied.send_replace(true);
        let copied = self.copied.clone();
        tokio::spawn(async move {
            tokio::time::sleep(COPIED_RESET_DELAY).await;
            copied.send_replace(false);
        });
    }
}

impl Default for CopyIndicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `text` to the clipboard and flash the indicator on success
pub async fn copy_text(
    sink: &dyn ClipboardSink,
    indicator: &CopyIndicator,
    text: &str,
) -> Result<(), ConvertError> {
    if text.is_empty() {
        return Err(ConvertError::CopyFailure("nothing to copy".to_string()));
    }
    sink.write_text(text)
        .await
        .map_err(|e| ConvertError::CopyFailure(e.to_string()))?;
    debug!("Copied {} chars", text.len());
    indicator.flash();
    Ok(())
}
