use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::ai::{CapabilityFactory, ChatCapability};
use crate::config::Config;
use crate::converter::{CodeConverter, ConversionGate};
use crate::readiness::{ProbeSettings, ReadinessState};
use crate::session::ClientSession;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub capability: Option<Arc<dyn ChatCapability>>,
    pub readiness: Arc<ReadinessState>,
    pub converter: Arc<CodeConverter>,
    /// Busy flag for the stateless REST conversion endpoint
    pub api_gate: Arc<ConversionGate>,
    pub client_sessions: Arc<DashMap<String, Arc<ClientSession>>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let capability = CapabilityFactory::create(&config.ai)?;
        Ok(Self::with_capability(config, capability))
    }

    pub fn with_capability(config: Config, capability: Option<Arc<dyn ChatCapability>>) -> Self {
        let readiness = Arc::new(ReadinessState::new());
        let converter = Arc::new(CodeConverter::new(
            capability.clone(),
            readiness.clone(),
            config.output.max_output_chars,
        ));

        Self {
            config,
            capability,
            readiness,
            converter,
            api_gate: ConversionGate::new(),
            client_sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn generate_client_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    pub fn provider_name(&self) -> &str {
        self.capability.as_deref().map_or("none", |c| c.name())
    }

    /// Probe the chat backend once in the background
    pub fn spawn_readiness_probe(&self) -> tokio::task::JoinHandle<bool> {
        let readiness = self.readiness.clone();
        let capability = self.capability.clone();
        let settings = ProbeSettings::from(&self.config.probe);
        info!(
            "Probing chat backend (attempts={}, active ping={})",
            settings.max_attempts, settings.allow_active_probe
        );

        tokio::spawn(async move { readiness.run_probe(capability.as_deref(), &settings).await })
    }
}
