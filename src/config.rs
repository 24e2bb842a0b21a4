use anyhow::Result;
use config::{Environment, File, FileFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix for environment overrides, e.g. `CODE_CONVERTER__PROBE__ALLOW_ACTIVE_PROBE=true`
pub const ENV_PREFIX: &str = "CODE_CONVERTER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ai: AiConfig,
    pub probe: ProbeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            static_dir: "static".to_string(),
        }
    }
}

/// Chat backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// `openai_compatible`, `ollama` or `none`
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl AiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "openai_compatible".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    pub base_timeout_ms: u64,
    /// Sends a live "ping" chat request as a last resort. Off by default since
    /// it can consume paid provider quota.
    pub allow_active_probe: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_timeout_ms: 3000,
            allow_active_probe: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub max_output_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_output_chars: 20_000,
        }
    }
}

static ENV_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}").unwrap());

impl Config {
    /// Load configuration from a YAML or JSON file, then apply environment overrides
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            anyhow::bail!("Configuration file not found: {}", path);
        }

        let content = substitute_env_vars(&load_text_file(path)?);
        let path_lower = path.to_lowercase();
        let format = if path_lower.ends_with(".json") || path_lower.ends_with(".jsonld") {
            FileFormat::Json
        } else {
            FileFormat::Yaml
        };

        Self::build(Some((&content, format)))
    }

    /// Defaults plus environment overrides, no file
    pub fn from_env() -> Result<Self> {
        Self::build(None)
    }

    /// Try each candidate path in order; fall back to defaults when none exist.
    /// Returns the path that was loaded, if any.
    pub fn load_first(paths: &[String]) -> Result<(Self, Option<String>)> {
        for path in paths {
            if !Path::new(path).exists() {
                debug!("No config at {}", path);
                continue;
            }
            return Ok((Self::load(path)?, Some(path.clone())));
        }
        Ok((Self::from_env()?, None))
    }

    fn build(file: Option<(&str, FileFormat)>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some((content, format)) = file {
            builder = builder.add_source(File::from_str(content, format));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

/// Replace `${VAR_NAME}` placeholders with environment values.
/// Unset variables are left untouched.
pub fn substitute_env_vars(content: &str) -> String {
    ENV_PLACEHOLDER
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Read a text file, tolerating a BOM and invalid UTF-8
pub fn load_text_file(path: &str) -> Result<String> {
    let bytes = fs::read(path)?;
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(&bytes);
    if had_errors {
        warn!(
            "Config file {} is not valid {}; invalid bytes were replaced",
            path,
            encoding.name()
        );
    }
    Ok(text.into_owned())
}
