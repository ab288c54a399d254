//! Core types for the TTS provider

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use voxbridge_core::{Result, VoxError};

/// Minimum byte size below which a backend response is not plausible audio
pub const MIN_AUDIO_SIZE: usize = 100;

/// Chat context class of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
    /// Group chat
    Group,
    /// Private (one-on-one) chat
    Private,
}

/// Audio output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// MP3 (most compatible)
    Mp3,
    /// WAV (uncompressed)
    Wav,
}

impl AudioFormat {
    /// Get format as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    /// Get MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }

    /// Get file extension
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Parse a configured format name, defaulting to MP3
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "wav" => Self::Wav,
            _ => Self::Mp3,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::Mp3
    }
}

/// A resolved request for speech synthesis. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    text: String,
    backend: Option<String>,
    voice: Option<String>,
    style: Option<String>,
    scope: ChatScope,
}

impl SpeechRequest {
    /// Create a request. Fails on empty or whitespace-only text.
    pub fn new(text: impl Into<String>, scope: ChatScope) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(VoxError::config("speech request text must not be empty"));
        }
        Ok(Self {
            text,
            backend: None,
            voice: None,
            style: None,
            scope,
        })
    }

    /// Request a specific backend instead of the configured default
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Request a specific voice instead of the backend's default
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Request a named style (reference-conditioned backends) or emotion
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// The text to synthesize
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Explicitly requested backend id, if any
    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    /// Explicitly requested voice name, if any
    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    /// Requested style, if any
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// Chat scope of the originating conversation
    pub fn scope(&self) -> ChatScope {
        self.scope
    }
}

/// What a backend adapter produced
#[derive(Debug, Clone)]
pub enum AudioOutput {
    /// Synthesized audio bytes
    Bytes {
        /// Raw audio data
        data: Bytes,
        /// Audio format of the data
        format: AudioFormat,
    },
    /// A fetchable reference to audio hosted elsewhere
    Remote {
        /// URL the audio can be fetched from
        url: String,
        /// Audio format behind the reference
        format: AudioFormat,
    },
    /// A platform-native voice command; the transport performs synthesis
    /// itself and no audio artifact ever exists on this side
    HostCommand {
        /// Text to speak
        text: String,
        /// Platform voice character id
        character: String,
    },
}

/// Result of one successful backend invocation. Consumed exactly once by
/// the delivery resolver.
#[derive(Debug, Clone)]
pub struct SpeechResult {
    /// The produced audio
    pub audio: AudioOutput,
    /// Id of the backend that produced it
    pub source_backend: String,
    /// Estimated playback duration, when the backend reports one
    pub duration_hint: Option<Duration>,
}

impl SpeechResult {
    /// MIME type of the audio, when an artifact exists
    pub fn mime_type(&self) -> Option<&'static str> {
        match &self.audio {
            AudioOutput::Bytes { format, .. } | AudioOutput::Remote { format, .. } => {
                Some(format.mime_type())
            }
            AudioOutput::HostCommand { .. } => None,
        }
    }
}

/// Transport-ready representation of a speech result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPayload {
    /// Audio written to disk, referenced by path
    FilePath {
        /// Absolute path of the finalized artifact
        path: PathBuf,
        /// MIME type of the artifact
        mime: &'static str,
    },
    /// Audio encoded inline
    Base64 {
        /// Base64-encoded audio data
        data: String,
        /// MIME type of the encoded audio
        mime: &'static str,
    },
    /// Platform-native voice command forwarded untouched
    HostVoice {
        /// Text to speak
        text: String,
        /// Platform voice character id
        character: String,
    },
}

/// Why a trigger decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// A force keyword matched the candidate text
    ForcedKeyword,
    /// The probability draw decided
    Probabilistic,
    /// Probability gating is disabled; no gating applied
    Disabled,
    /// Manual command invocation; gating bypassed
    Manual,
}

/// Outcome of gating one automatic-trigger candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerDecision {
    /// Whether the candidate should be spoken
    pub should_speak: bool,
    /// How the decision was reached
    pub reason: TriggerReason,
}

/// Check that a backend response body is plausibly audio
pub fn validate_audio_data(data: &[u8]) -> Result<()> {
    if data.len() < MIN_AUDIO_SIZE {
        return Err(VoxError::unavailable(format!(
            "audio data too small ({} bytes < {} bytes)",
            data.len(),
            MIN_AUDIO_SIZE
        )));
    }
    Ok(())
}

/// Backend adapter seam - implemented by each TTS integration
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Stable backend identifier
    fn id(&self) -> &'static str;

    /// Whether the backend may serve private chats
    fn supports_private_chat(&self) -> bool {
        true
    }

    /// Backend-specific invocation timeout; None falls back to the global one
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Verify mandatory credentials/configuration at registry build time
    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    /// The backend's configured default voice
    fn default_voice(&self) -> String;

    /// Resolve a requested voice name (or the default) to a backend voice id
    fn resolve_voice(&self, voice: Option<&str>) -> Result<String>;

    /// Convert text to audio with the already-resolved voice id
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        style: Option<&str>,
    ) -> Result<AudioOutput>;
}
