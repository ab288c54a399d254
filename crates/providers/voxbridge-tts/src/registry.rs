//! Backend registry
//!
//! Built once from a configuration snapshot and read-only afterwards, so
//! concurrent dispatches share it without synchronization. Validation is
//! deliberately eager: a backend enabled without its mandatory credentials
//! is reported at build time and excluded, instead of failing on first use.
//! A misconfigured default backend fails the whole build.

use std::fmt;
use std::sync::Arc;
use voxbridge_core::{Result, TtsConfig, VoxError};

use crate::backends::{AiVoiceBackend, DoubaoBackend, GptSovitsBackend, Gsv2pBackend};
use crate::types::{ChatScope, TtsBackend};

/// Immutable set of validated, enabled backends
pub struct BackendRegistry {
    backends: Vec<Arc<dyn TtsBackend>>,
    config_errors: Vec<(String, String)>,
}

// trait objects have no Debug; show the ids instead
impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.id()).collect::<Vec<_>>(),
            )
            .field("config_errors", &self.config_errors)
            .finish()
    }
}

impl BackendRegistry {
    /// Build the registry from a configuration snapshot
    ///
    /// Enabled backends that fail credential validation are excluded and
    /// recorded in [`config_errors`](Self::config_errors). Fails outright
    /// when the configured default backend is unusable.
    pub fn build(config: &TtsConfig) -> Result<Self> {
        let mut candidates: Vec<Arc<dyn TtsBackend>> = Vec::new();
        if config.ai_voice.enabled {
            candidates.push(Arc::new(AiVoiceBackend::new(config.ai_voice.clone())));
        }
        if config.gsv2p.enabled {
            candidates.push(Arc::new(Gsv2pBackend::new(config.gsv2p.clone())));
        }
        if config.gpt_sovits.enabled {
            candidates.push(Arc::new(GptSovitsBackend::new(config.gpt_sovits.clone())));
        }
        if config.doubao.enabled {
            candidates.push(Arc::new(DoubaoBackend::new(config.doubao.clone())));
        }

        let mut backends = Vec::new();
        let mut config_errors = Vec::new();
        for backend in candidates {
            match backend.validate_config() {
                Ok(()) => {
                    tracing::debug!("registered TTS backend: {}", backend.id());
                    backends.push(backend);
                }
                Err(e) => {
                    tracing::warn!("TTS backend '{}' disabled at startup: {}", backend.id(), e);
                    config_errors.push((backend.id().to_string(), e.to_string()));
                }
            }
        }

        let default = &config.general.default_backend;
        if !backends.iter().any(|b| b.id() == default.as_str()) {
            let reason = config_errors
                .iter()
                .find(|(id, _)| id == default)
                .map(|(_, msg)| format!("failed validation: {}", msg))
                .unwrap_or_else(|| "is not enabled".to_string());
            return Err(VoxError::config(format!(
                "default backend '{}' {}",
                default, reason
            )));
        }

        Ok(Self {
            backends,
            config_errors,
        })
    }

    /// Create a registry from pre-built adapters (custom integrations,
    /// tests); no validation is re-run
    pub fn with_backends(backends: Vec<Arc<dyn TtsBackend>>) -> Self {
        Self {
            backends,
            config_errors: Vec::new(),
        }
    }

    /// Look up a backend by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn TtsBackend>> {
        self.backends.iter().find(|b| b.id() == id).cloned()
    }

    /// Enabled backends compatible with the given scope, in registration
    /// order
    pub fn list_enabled(&self, scope: ChatScope) -> Vec<Arc<dyn TtsBackend>> {
        self.backends
            .iter()
            .filter(|b| scope != ChatScope::Private || b.supports_private_chat())
            .cloned()
            .collect()
    }

    /// Backends that were enabled but excluded at build time, with reasons
    pub fn config_errors(&self) -> &[(String, String)] {
        &self.config_errors
    }
}
