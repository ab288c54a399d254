//! Request dispatch
//!
//! Resolves a speech request to one concrete backend, invokes it under a
//! hard timeout, and classifies the outcome. The only rerouting performed
//! is the scope fallback: a group-only backend asked to serve a private
//! chat is replaced by the first enabled scope-compatible backend. A failed
//! invocation surfaces as an error; there is no silent cross-backend
//! fallback.

use std::sync::Arc;
use std::time::Duration;
use voxbridge_core::{GeneralConfig, Result, VoxError};

use crate::registry::BackendRegistry;
use crate::text::clean_text;
use crate::types::{AudioOutput, ChatScope, SpeechRequest, SpeechResult, TtsBackend};

/// Routes speech requests to backends
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    general: GeneralConfig,
}

impl Dispatcher {
    /// Create a dispatcher over a registry snapshot
    pub fn new(registry: Arc<BackendRegistry>, general: GeneralConfig) -> Self {
        Self { registry, general }
    }

    /// Dispatch one request: select a backend, invoke it, tag the result
    pub async fn dispatch(&self, request: &SpeechRequest) -> Result<SpeechResult> {
        let backend = self.resolve_backend(request)?;
        let voice_id = backend.resolve_voice(request.voice())?;

        // markup/emoji stripping and slang rewriting happen before the
        // length check; backends receive speakable text only
        let text = clean_text(request.text());
        if text.is_empty() {
            return Err(VoxError::config("no speakable text left after cleanup"));
        }
        let length = text.chars().count();
        if length > self.general.max_text_length {
            // over-long text is rejected, never truncated
            return Err(VoxError::TextTooLong {
                length,
                max: self.general.max_text_length,
            });
        }

        let timeout = backend
            .timeout()
            .unwrap_or(Duration::from_secs(self.general.timeout_secs));
        tracing::info!(
            "dispatching to '{}' (voice: {}, timeout: {}s, text_len: {})",
            backend.id(),
            voice_id,
            timeout.as_secs(),
            length
        );

        let audio = self
            .invoke(backend.as_ref(), &text, request.style(), &voice_id, timeout)
            .await?;
        Ok(SpeechResult {
            audio,
            source_backend: backend.id().to_string(),
            duration_hint: None,
        })
    }

    /// Resolve the target backend: explicit request, then configured
    /// default, then the scope fallback rule
    fn resolve_backend(&self, request: &SpeechRequest) -> Result<Arc<dyn TtsBackend>> {
        let target = request
            .backend()
            .and_then(|id| self.registry.get(id))
            .or_else(|| self.registry.get(&self.general.default_backend))
            .ok_or(VoxError::NoBackendAvailable)?;

        if request.scope() == ChatScope::Private && !target.supports_private_chat() {
            let fallback = self
                .registry
                .list_enabled(ChatScope::Private)
                .into_iter()
                .find(|b| b.id() != target.id());
            return match fallback {
                Some(backend) => {
                    tracing::info!(
                        "backend '{}' cannot serve private chats, substituting '{}'",
                        target.id(),
                        backend.id()
                    );
                    Ok(backend)
                }
                None => Err(VoxError::ScopeMismatch {
                    backend: target.id().to_string(),
                }),
            };
        }

        Ok(target)
    }

    /// Invoke under timeout, retrying transient failures once
    async fn invoke(
        &self,
        backend: &dyn TtsBackend,
        text: &str,
        style: Option<&str>,
        voice_id: &str,
        timeout: Duration,
    ) -> Result<AudioOutput> {
        let mut attempt = 0;
        loop {
            let outcome =
                tokio::time::timeout(timeout, backend.synthesize(text, voice_id, style)).await;

            match outcome {
                Err(_) => {
                    // a fired timeout terminates the request; no retry
                    return Err(VoxError::BackendTimeout {
                        backend: backend.id().to_string(),
                        secs: timeout.as_secs(),
                    });
                }
                Ok(Ok(audio)) => return Ok(audio),
                Ok(Err(e)) if e.is_retryable() && attempt == 0 => {
                    tracing::warn!("backend '{}' failed, retrying once: {}", backend.id(), e);
                    attempt += 1;
                }
                Ok(Err(e)) => {
                    tracing::error!("backend '{}' failed: {}", backend.id(), e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::types::AudioFormat;

    enum Behavior {
        Succeed,
        FailOnceThenSucceed,
        AlwaysUnavailable,
        ConfigError,
        Hang,
    }

    struct FakeBackend {
        id: &'static str,
        private_ok: bool,
        timeout: Option<Duration>,
        behavior: Behavior,
        calls: AtomicUsize,
        seen_text: std::sync::Mutex<Option<String>>,
    }

    impl FakeBackend {
        fn new(id: &'static str, behavior: Behavior) -> Self {
            Self {
                id,
                private_ok: true,
                timeout: None,
                behavior,
                calls: AtomicUsize::new(0),
                seen_text: std::sync::Mutex::new(None),
            }
        }

        fn group_only(mut self) -> Self {
            self.private_ok = false;
            self
        }

        fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TtsBackend for FakeBackend {
        fn id(&self) -> &'static str {
            self.id
        }

        fn supports_private_chat(&self) -> bool {
            self.private_ok
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        fn default_voice(&self) -> String {
            "fake-voice".to_string()
        }

        fn resolve_voice(&self, voice: Option<&str>) -> Result<String> {
            Ok(voice.unwrap_or("fake-voice").to_string())
        }

        async fn synthesize(
            &self,
            text: &str,
            _voice_id: &str,
            _style: Option<&str>,
        ) -> Result<AudioOutput> {
            *self.seen_text.lock().unwrap() = Some(text.to_string());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => {}
                Behavior::FailOnceThenSucceed if call == 0 => {
                    return Err(VoxError::unavailable("first attempt fails"))
                }
                Behavior::FailOnceThenSucceed => {}
                Behavior::AlwaysUnavailable => {
                    return Err(VoxError::unavailable("backend down"))
                }
                Behavior::ConfigError => {
                    return Err(VoxError::backend_config("bad credentials"))
                }
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
            }
            Ok(AudioOutput::Bytes {
                data: Bytes::from_static(&[0u8; 200]),
                format: AudioFormat::Mp3,
            })
        }
    }

    fn general(default_backend: &str) -> GeneralConfig {
        GeneralConfig {
            default_backend: default_backend.to_string(),
            timeout_secs: 5,
            max_text_length: 500,
            audio_output_dir: String::new(),
            use_base64_audio: false,
        }
    }

    fn dispatcher(backends: Vec<Arc<FakeBackend>>, default_backend: &str) -> Dispatcher {
        let backends: Vec<Arc<dyn TtsBackend>> =
            backends.into_iter().map(|b| b as Arc<dyn TtsBackend>).collect();
        Dispatcher::new(
            Arc::new(BackendRegistry::with_backends(backends)),
            general(default_backend),
        )
    }

    #[tokio::test]
    async fn test_private_scope_substitutes_group_only_default() {
        let group_only = Arc::new(FakeBackend::new("ai_voice", Behavior::Succeed).group_only());
        let fallback = Arc::new(FakeBackend::new("gsv2p", Behavior::Succeed));
        let dispatcher = dispatcher(vec![group_only.clone(), fallback.clone()], "ai_voice");

        let request = SpeechRequest::new("你好世界", ChatScope::Private).unwrap();
        let result = dispatcher.dispatch(&request).await.unwrap();

        assert_eq!(result.source_backend, "gsv2p");
        assert_eq!(group_only.calls(), 0);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_group_only_backend_never_invoked_for_private_even_when_explicit() {
        let group_only = Arc::new(FakeBackend::new("ai_voice", Behavior::Succeed).group_only());
        let dispatcher = dispatcher(vec![group_only.clone()], "ai_voice");

        let request = SpeechRequest::new("hi", ChatScope::Private)
            .unwrap()
            .with_backend("ai_voice");
        let err = dispatcher.dispatch(&request).await.unwrap_err();

        assert!(matches!(err, VoxError::ScopeMismatch { ref backend } if backend == "ai_voice"));
        assert_eq!(group_only.calls(), 0);
    }

    #[tokio::test]
    async fn test_group_scope_uses_group_only_default() {
        let group_only = Arc::new(FakeBackend::new("ai_voice", Behavior::Succeed).group_only());
        let dispatcher = dispatcher(vec![group_only.clone()], "ai_voice");

        let request = SpeechRequest::new("hi", ChatScope::Group).unwrap();
        let result = dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(result.source_backend, "ai_voice");
        assert_eq!(group_only.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_explicit_backend_falls_back_to_default() {
        let fallback = Arc::new(FakeBackend::new("gsv2p", Behavior::Succeed));
        let dispatcher = dispatcher(vec![fallback.clone()], "gsv2p");

        let request = SpeechRequest::new("hi", ChatScope::Group)
            .unwrap()
            .with_backend("does_not_exist");
        let result = dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(result.source_backend, "gsv2p");
    }

    #[tokio::test]
    async fn test_empty_registry_is_no_backend_available() {
        let dispatcher = dispatcher(vec![], "gsv2p");
        let request = SpeechRequest::new("hi", ChatScope::Group).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&request).await.unwrap_err(),
            VoxError::NoBackendAvailable
        ));
    }

    #[tokio::test]
    async fn test_over_long_text_rejected_before_invocation() {
        let backend = Arc::new(FakeBackend::new("gsv2p", Behavior::Succeed));
        let mut dispatcher = dispatcher(vec![backend.clone()], "gsv2p");
        dispatcher.general.max_text_length = 5;

        let request = SpeechRequest::new("六个字符的文本", ChatScope::Group).unwrap();
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, VoxError::TextTooLong { length: 7, max: 5 }));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_text_cleaned_before_synthesis() {
        let backend = Arc::new(FakeBackend::new("gsv2p", Behavior::Succeed));
        let dispatcher = dispatcher(vec![backend.clone()], "gsv2p");

        let request = SpeechRequest::new("太好笑了www🎉666", ChatScope::Group).unwrap();
        dispatcher.dispatch(&request).await.unwrap();

        assert_eq!(
            backend.seen_text.lock().unwrap().as_deref(),
            Some("太好笑了哈哈哈厉害")
        );
    }

    #[tokio::test]
    async fn test_emoji_only_text_rejected_without_invocation() {
        let backend = Arc::new(FakeBackend::new("gsv2p", Behavior::Succeed));
        let dispatcher = dispatcher(vec![backend.clone()], "gsv2p");

        let request = SpeechRequest::new("🎉✨", ChatScope::Group).unwrap();
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, VoxError::Config(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_fails_terminally() {
        let backend = Arc::new(
            FakeBackend::new("gsv2p", Behavior::Hang).with_timeout(Duration::from_millis(20)),
        );
        let dispatcher = dispatcher(vec![backend.clone()], "gsv2p");

        let request = SpeechRequest::new("hi", ChatScope::Group).unwrap();
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, VoxError::BackendTimeout { .. }));
        // no retry after a fired timeout
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let backend = Arc::new(FakeBackend::new("gsv2p", Behavior::FailOnceThenSucceed));
        let dispatcher = dispatcher(vec![backend.clone()], "gsv2p");

        let request = SpeechRequest::new("hi", ChatScope::Group).unwrap();
        let result = dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(result.source_backend, "gsv2p");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_persistent_unavailability_surfaces_after_one_retry() {
        let backend = Arc::new(FakeBackend::new("gsv2p", Behavior::AlwaysUnavailable));
        let dispatcher = dispatcher(vec![backend.clone()], "gsv2p");

        let request = SpeechRequest::new("hi", ChatScope::Group).unwrap();
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, VoxError::BackendUnavailable(_)));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_config_error_not_retried() {
        let backend = Arc::new(FakeBackend::new("gsv2p", Behavior::ConfigError));
        let dispatcher = dispatcher(vec![backend.clone()], "gsv2p");

        let request = SpeechRequest::new("hi", ChatScope::Group).unwrap();
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, VoxError::BackendConfig(_)));
        assert_eq!(backend.calls(), 1);
    }
}
