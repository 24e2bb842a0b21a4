use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::converter::{ConversionGate, ConversionRequest, ConversionResult};
use crate::copy::CopyIndicator;
use crate::error::ConvertError;
use crate::languages::{find_language, Language, DEFAULT_SOURCE, DEFAULT_TARGET, LANGUAGES};

/// Editor contents and selections for one connected page
#[derive(Debug, Clone)]
pub struct EditorSession {
    source_language: &'static Language,
    target_language: &'static Language,
    source_text: String,
    /// Example most recently inserted by the app, not by the user
    last_example: Option<&'static str>,
    result: Option<ConversionResult>,
}

/// Snapshot pushed to the page after every change
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub source_language: &'static str,
    pub target_language: &'static str,
    pub source_text: String,
    pub result: Option<ConversionResult>,
    pub ready: bool,
    pub busy: bool,
    pub copied: bool,
}

impl EditorSession {
    pub fn new() -> Self {
        let source = find_language(DEFAULT_SOURCE).unwrap_or(&LANGUAGES[0]);
        let target = find_language(DEFAULT_TARGET).unwrap_or(&LANGUAGES[1]);
        Self {
            source_language: source,
            target_language: target,
            source_text: source.example.to_string(),
            last_example: Some(source.example),
            result: None,
        }
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    /// Switch the source language. The editor text is swapped for the new
    /// example only when it still holds the last inserted example.
    /// Returns whether the text was replaced.
    pub fn select_source_language(&mut self, name: &str) -> Result<bool, ConvertError> {
        let language =
            find_language(name).ok_or_else(|| ConvertError::UnsupportedLanguage(name.to_string()))?;
        self.source_language = language;

        if self.last_example == Some(self.source_text.as_str()) {
            self.insert_example();
            return Ok(true);
        }
        Ok(false)
    }

    pub fn select_target_language(&mut self, name: &str) -> Result<(), ConvertError> {
        self.target_language =
            find_language(name).ok_or_else(|| ConvertError::UnsupportedLanguage(name.to_string()))?;
        Ok(())
    }

    pub fn edit_source(&mut self, text: String) {
        self.source_text = text;
    }

    /// Restore the built-in example for the selected source language
    pub fn reset_example(&mut self) {
        self.insert_example();
    }

    fn insert_example(&mut self) {
        let example = self.source_language.example;
        self.source_text = example.to_string();
        self.last_example = Some(example);
    }

    pub fn conversion_request(&self) -> ConversionRequest {
        ConversionRequest {
            source_language: self.source_language.name.to_string(),
            target_language: self.target_language.name.to_string(),
            source_text: self.source_text.clone(),
        }
    }

    /// Replace the previous result; no history is kept
    pub fn set_result(&mut self, result: ConversionResult) {
        self.result = Some(result);
    }

    pub fn snapshot(&self, ready: bool, busy: bool, copied: bool) -> SessionSnapshot {
        SessionSnapshot {
            source_language: self.source_language.name,
            target_language: self.target_language.name,
            source_text: self.source_text.clone(),
            result: self.result.clone(),
            ready,
            busy,
            copied,
        }
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the server keeps for one WebSocket client
pub struct ClientSession {
    pub client_uid: String,
    pub editor: Mutex<EditorSession>,
    pub gate: Arc<ConversionGate>,
    pub copied: CopyIndicator,
}

impl ClientSession {
    pub fn new(client_uid: String) -> Self {
        Self {
            client_uid,
            editor: Mutex::new(EditorSession::new()),
            gate: ConversionGate::new(),
            copied: CopyIndicator::new(),
        }
    }

    pub async fn snapshot(&self, ready: bool) -> SessionSnapshot {
        self.editor
            .lock()
            .await
            .snapshot(ready, self.gate.is_busy(), self.copied.is_copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(name: &str) -> &'static str {
        find_language(name).unwrap().example
    }

    #[test]
    fn starts_with_default_example() {
        let session = EditorSession::new();
        assert_eq!(session.source_language.name, "Python");
        assert_eq!(session.target_language.name, "JavaScript");
        assert_eq!(session.source_text, example("Python"));
        assert!(session.result().is_none());
    }

    #[test]
    fn untouched_example_follows_language_switch() {
        let mut session = EditorSession::new();
        assert!(session.select_source_language("go").unwrap());
        assert_eq!(session.source_text, example("Go"));

        assert!(session.select_source_language("Ruby").unwrap());
        assert_eq!(session.source_text, example("Ruby"));
    }

    #[test]
    fn user_edits_survive_language_switch() {
        let mut session = EditorSession::new();
        session.edit_source("x = compute()".into());

        assert!(!session.select_source_language("Java").unwrap());
        assert_eq!(session.source_text, "x = compute()");
        assert_eq!(session.source_language.name, "Java");
    }

    #[test]
    fn reset_restores_example_and_rearms_switching() {
        let mut session = EditorSession::new();
        session.edit_source("custom".into());
        session.select_source_language("Kotlin").unwrap();

        session.reset_example();
        assert_eq!(session.source_text, example("Kotlin"));
        assert!(session.select_source_language("Swift").unwrap());
        assert_eq!(session.source_text, example("Swift"));
    }

    #[test]
    fn unknown_language_leaves_state_alone() {
        let mut session = EditorSession::new();
        assert!(matches!(
            session.select_source_language("Klingon"),
            Err(ConvertError::UnsupportedLanguage(_))
        ));
        assert!(session.select_target_language("Klingon").is_err());
        assert_eq!(session.source_language.name, "Python");
        assert_eq!(session.target_language.name, "JavaScript");
    }

    #[test]
    fn new_result_replaces_previous() {
        let mut session = EditorSession::new();
        let first = ConversionResult {
            display_text: "a".into(),
            truncated: false,
            dangerous_shell: false,
        };
        let second = ConversionResult {
            display_text: "b".into(),
            ..first.clone()
        };
        session.set_result(first);
        session.set_result(second.clone());
        assert_eq!(session.result(), Some(&second));

        let request = session.conversion_request();
        assert_eq!(request.source_language, "Python");
        assert_eq!(request.target_language, "JavaScript");
    }
}
