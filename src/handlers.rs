use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::copy::{copy_text, ClipboardSink};
use crate::error::ConvertError;
use crate::session::ClientSession;
use crate::state::AppState;

/// Outgoing half of a client's WebSocket
pub type WebSocketSend = mpsc::UnboundedSender<String>;

/// Clipboard writes are performed by the page; we ask it to do so
pub struct WebSocketClipboard {
    out: WebSocketSend,
}

#[async_trait]
impl ClipboardSink for WebSocketClipboard {
    async fn write_text(&self, text: &str) -> anyhow::Result<()> {
        send_json(&self.out, json!({"type": "clipboard-write", "text": text}))
    }
}

pub async fn handle_message(
    state: &AppState,
    session: &Arc<ClientSession>,
    text: &str,
    out: &WebSocketSend,
) -> anyhow::Result<()> {
    let msg: Value = serde_json::from_str(text)?;
    let msg_type = msg.get("type").and_then(|v| v.as_str());

    match msg_type {
        Some("fetch-state") => {
            send_state(state, session, out).await?;
        }
        Some("set-source-language") => {
            handle_set_source_language(state, session, &msg, out).await?;
        }
        Some("set-target-language") => {
            handle_set_target_language(state, session, &msg, out).await?;
        }
        Some("edit-source") => {
            handle_edit_source(session, &msg).await?;
        }
        Some("reset-example") => {
            session.editor.lock().await.reset_example();
            send_state(state, session, out).await?;
        }
        Some("convert") => {
            handle_convert(state, session, out).await?;
        }
        Some("copy-result") => {
            handle_copy(session, out).await?;
        }
        _ => {
            warn!("Unknown message type: {:?}", msg_type);
        }
    }

    Ok(())
}

fn required_str<'a>(msg: &'a Value, field: &str) -> anyhow::Result<&'a str> {
    msg.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("{} is required", field))
}

async fn handle_set_source_language(
    state: &AppState,
    session: &Arc<ClientSession>,
    msg: &Value,
    out: &WebSocketSend,
) -> anyhow::Result<()> {
    let language = required_str(msg, "language")?;
    let result = session.editor.lock().await.select_source_language(language);
    match result {
        Ok(replaced) => debug!(
            "Client {} source language -> {} (example inserted: {})",
            session.client_uid, language, replaced
        ),
        Err(e) => send_notice(out, &e)?,
    }
    send_state(state, session, out).await
}

async fn handle_set_target_language(
    state: &AppState,
    session: &Arc<ClientSession>,
    msg: &Value,
    out: &WebSocketSend,
) -> anyhow::Result<()> {
    let language = required_str(msg, "language")?;
    let result = session.editor.lock().await.select_target_language(language);
    if let Err(e) = result {
        send_notice(out, &e)?;
    }
    send_state(state, session, out).await
}

async fn handle_edit_source(session: &Arc<ClientSession>, msg: &Value) -> anyhow::Result<()> {
    let text = required_str(msg, "text")?;
    session.editor.lock().await.edit_source(text.to_string());
    Ok(())
}

/// The gate is claimed before `conversion-started` is sent; the chat call then
/// runs in its own task so the socket keeps reading.
async fn handle_convert(
    state: &AppState,
    session: &Arc<ClientSession>,
    out: &WebSocketSend,
) -> anyhow::Result<()> {
    let request = session.editor.lock().await.conversion_request();
    let pending = match state.converter.begin(&session.gate, &request) {
        Ok(pending) => pending,
        Err(e) => {
            info!("Conversion for client {} rejected: {}", session.client_uid, e);
            send_notice(out, &e)?;
            return send_state(state, session, out).await;
        }
    };
    send_json(out, json!({"type": "conversion-started"}))?;

    let state = state.clone();
    let session = session.clone();
    let out = out.clone();
    tokio::spawn(async move {
        match pending.run().await {
            Ok(result) => {
                session.editor.lock().await.set_result(result.clone());
                let _ = send_json(
                    &out,
                    json!({
                        "type": "conversion-result",
                        "display_text": result.display_text,
                        "truncated": result.truncated,
                        "dangerous_shell": result.dangerous_shell,
                    }),
                );
                if result.dangerous_shell {
                    let _ = send_json(
                        &out,
                        json!({
                            "type": "notice",
                            "level": "warning",
                            "kind": "dangerous_shell",
                            "text": "The converted code contains potentially dangerous shell commands. Review it before running.",
                        }),
                    );
                }
            }
            Err(e) => {
                info!("Conversion for client {} failed: {}", session.client_uid, e);
                let _ = send_notice(&out, &e);
            }
        }

        let _ = send_state(&state, &session, &out).await;
    });

    Ok(())
}

async fn handle_copy(session: &Arc<ClientSession>, out: &WebSocketSend) -> anyhow::Result<()> {
    let text = session
        .editor
        .lock()
        .await
        .result()
        .map(|r| r.display_text.clone())
        .unwrap_or_default();

    let sink = WebSocketClipboard { out: out.clone() };
    if let Err(e) = copy_text(&sink, &session.copied, &text).await {
        send_notice(out, &e)?;
    }
    Ok(())
}

pub fn send_json(out: &WebSocketSend, value: Value) -> anyhow::Result<()> {
    out.send(value.to_string())
        .map_err(|_| anyhow::anyhow!("client channel closed"))
}

pub fn send_notice(out: &WebSocketSend, err: &ConvertError) -> anyhow::Result<()> {
    send_json(
        out,
        json!({
            "type": "notice",
            "level": "error",
            "kind": err.kind(),
            "text": err.to_string(),
        }),
    )
}

pub async fn send_state(
    state: &AppState,
    session: &Arc<ClientSession>,
    out: &WebSocketSend,
) -> anyhow::Result<()> {
    let snapshot = session.snapshot(state.readiness.is_ready()).await;
    send_json(out, json!({"type": "session-state", "state": snapshot}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scripted::{ScriptedCapability, Signal};
    use crate::ai::ChatCapability;
    use crate::config::Config;
    use crate::languages::find_language;
    use std::time::Duration;

    async fn setup(
        capability: ScriptedCapability,
        probe: bool,
    ) -> (AppState, Arc<ClientSession>, WebSocketSend, mpsc::UnboundedReceiver<String>) {
        let capability: Arc<dyn ChatCapability> = Arc::new(capability);
        let state = AppState::with_capability(Config::default(), Some(capability));
        if probe {
            assert!(state.spawn_readiness_probe().await.unwrap());
        }
        let session = Arc::new(ClientSession::new("client-1".into()));
        let (out, rx) = mpsc::unbounded_channel();
        (state, session, out, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> Value {
        let text = rx.recv().await.expect("channel open");
        serde_json::from_str(&text).unwrap()
    }

    fn ready_backend() -> ScriptedCapability {
        ScriptedCapability::new().with_ready(Signal::ResolveAfter(Duration::ZERO))
    }

    #[tokio::test]
    async fn unknown_language_produces_notice_then_state() {
        let (state, session, out, mut rx) = setup(ready_backend(), false).await;
        handle_message(&state, &session, r#"{"type":"set-source-language","language":"Klingon"}"#, &out)
            .await
            .unwrap();

        let notice = next(&mut rx).await;
        assert_eq!(notice["type"], "notice");
        assert_eq!(notice["kind"], "unsupported_language");
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot["type"], "session-state");
        assert_eq!(snapshot["state"]["source_language"], "Python");
    }

    #[tokio::test]
    async fn edited_text_is_kept_when_switching_language() {
        let (state, session, out, mut rx) = setup(ready_backend(), false).await;
        handle_message(&state, &session, r#"{"type":"edit-source","text":"total = 3"}"#, &out)
            .await
            .unwrap();
        handle_message(&state, &session, r#"{"type":"set-source-language","language":"Ruby"}"#, &out)
            .await
            .unwrap();

        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot["state"]["source_language"], "Ruby");
        assert_eq!(snapshot["state"]["source_text"], "total = 3");

        handle_message(&state, &session, r#"{"type":"reset-example"}"#, &out)
            .await
            .unwrap();
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot["state"]["source_text"], find_language("Ruby").unwrap().example);
    }

    #[tokio::test]
    async fn convert_before_ready_is_rejected() {
        let (state, session, out, mut rx) = setup(ScriptedCapability::new(), false).await;
        handle_message(&state, &session, r#"{"type":"convert"}"#, &out)
            .await
            .unwrap();

        let notice = next(&mut rx).await;
        assert_eq!(notice["kind"], "not_ready");
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot["state"]["ready"], false);
        assert_eq!(snapshot["state"]["busy"], false);
    }

    #[tokio::test]
    async fn convert_then_copy() {
        let backend = ready_backend().with_reply("```js\nconsole.log(1);\n```");
        let (state, session, out, mut rx) = setup(backend, true).await;

        handle_message(&state, &session, r#"{"type":"convert"}"#, &out)
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await["type"], "conversion-started");
        let result = next(&mut rx).await;
        assert_eq!(result["type"], "conversion-result");
        assert_eq!(result["display_text"], "console.log(1);");
        assert_eq!(result["truncated"], false);
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot["state"]["result"]["display_text"], "console.log(1);");

        handle_message(&state, &session, r#"{"type":"copy-result"}"#, &out)
            .await
            .unwrap();
        let write = next(&mut rx).await;
        assert_eq!(write["type"], "clipboard-write");
        assert_eq!(write["text"], "console.log(1);");
        assert!(session.copied.is_copied());
    }

    #[tokio::test]
    async fn copy_without_result_is_a_copy_failure() {
        let (state, session, out, mut rx) = setup(ready_backend(), false).await;
        handle_message(&state, &session, r#"{"type":"copy-result"}"#, &out)
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await["kind"], "copy_failure");
        assert!(!session.copied.is_copied());
    }

    #[tokio::test]
    async fn unknown_and_malformed_messages() {
        let (state, session, out, mut rx) = setup(ready_backend(), false).await;
        handle_message(&state, &session, r#"{"type":"dance"}"#, &out)
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());

        assert!(handle_message(&state, &session, "not json", &out).await.is_err());
        assert!(handle_message(&state, &session, r#"{"type":"edit-source"}"#, &out)
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn second_convert_while_busy_gets_only_a_busy_notice() {
        let backend = ready_backend()
            .with_reply("let x = 1;")
            .with_chat_delay(Duration::from_secs(5));
        let (state, session, out, mut rx) = setup(backend, true).await;

        handle_message(&state, &session, r#"{"type":"convert"}"#, &out)
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await["type"], "conversion-started");
        assert!(session.gate.is_busy());

        handle_message(&state, &session, r#"{"type":"convert"}"#, &out)
            .await
            .unwrap();
        let notice = next(&mut rx).await;
        assert_eq!(notice["type"], "notice");
        assert_eq!(notice["kind"], "busy");
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot["state"]["busy"], true);

        let result = next(&mut rx).await;
        assert_eq!(result["type"], "conversion-result");
        assert_eq!(result["display_text"], "let x = 1;");
        assert_eq!(next(&mut rx).await["state"]["busy"], false);
    }
}
