//! VoxBridge TTS provider
//!
//! Multi-backend text-to-speech dispatch for chat transports. Four backend
//! adapters (platform-native `ai_voice`, cloud `gsv2p`, local `gpt_sovits`,
//! streaming `doubao`) sit behind one [`types::TtsBackend`] seam; the
//! [`registry::BackendRegistry`] validates and holds them, the
//! [`dispatch::Dispatcher`] routes requests, the
//! [`trigger::TriggerArbiter`] gates automatic invocations, and the
//! [`delivery::DeliveryResolver`] turns audio into something a transport
//! can send. [`TtsService`] wires the pipeline together.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backends;
pub mod delivery;
pub mod dispatch;
pub mod registry;
pub mod text;
pub mod trigger;
pub mod types;

pub use delivery::{DeliveryConfig, DeliveryResolver};
pub use dispatch::Dispatcher;
pub use registry::BackendRegistry;
pub use trigger::TriggerArbiter;
pub use types::{
    AudioFormat, AudioOutput, ChatScope, DeliveryPayload, SpeechRequest, SpeechResult,
    TriggerDecision, TriggerReason, TtsBackend,
};

use std::sync::Arc;
use voxbridge_core::{Result, TtsConfig};

/// The assembled pipeline: trigger gating, dispatch, delivery
pub struct TtsService {
    trigger: TriggerArbiter,
    dispatcher: Dispatcher,
    delivery: DeliveryResolver,
}

impl TtsService {
    /// Build the full pipeline from a configuration snapshot
    ///
    /// Fails when the registry does (unusable default backend).
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        let registry = Arc::new(BackendRegistry::build(config)?);
        Ok(Self {
            trigger: TriggerArbiter::new(config.probability.clone()),
            dispatcher: Dispatcher::new(registry, config.general.clone()),
            delivery: DeliveryResolver::new(DeliveryConfig::from(&config.general)),
        })
    }

    /// Speak unconditionally (manual command path)
    pub async fn speak(&self, request: &SpeechRequest) -> Result<DeliveryPayload> {
        let result = self.dispatcher.dispatch(request).await?;
        self.delivery.resolve(result).await
    }

    /// Speak if the trigger arbiter lets the candidate through
    /// (automatic path); `None` means the candidate stays text
    pub async fn maybe_speak(&self, request: &SpeechRequest) -> Result<Option<DeliveryPayload>> {
        let decision = self.trigger.decide(request.text());
        if !decision.should_speak {
            tracing::debug!("trigger declined candidate ({:?})", decision.reason);
            return Ok(None);
        }
        tracing::debug!("trigger accepted candidate ({:?})", decision.reason);
        Ok(Some(self.speak(request).await?))
    }
}
