//! Configuration snapshot structures
//!
//! These structs are the already-parsed form of the plugin configuration.
//! The host loads them (TOML, JSON, whatever it speaks) and hands the whole
//! snapshot to the registry at construction. The snapshot is immutable for
//! the process lifetime; a reload builds a new snapshot and swaps it
//! atomically, so in-flight dispatches never observe a half-updated state.

use serde::Deserialize;
use std::collections::HashMap;

/// Full TTS configuration snapshot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Global defaults and delivery settings
    pub general: GeneralConfig,
    /// Automatic-trigger probability control
    pub probability: ProbabilityConfig,
    /// AI Voice backend (platform-native, group chats only)
    pub ai_voice: AiVoiceConfig,
    /// GSV2P cloud API backend
    pub gsv2p: Gsv2pConfig,
    /// Local GPT-SoVITS server backend
    pub gpt_sovits: GptSovitsConfig,
    /// Doubao (ByteDance) streaming API backend
    pub doubao: DoubaoConfig,
}

/// Global defaults shared by all backends
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Backend used when a request names none
    pub default_backend: String,
    /// Global invocation timeout in seconds, used when a backend has no
    /// timeout of its own
    pub timeout_secs: u64,
    /// Maximum accepted text length in characters; longer requests are
    /// rejected, never truncated
    pub max_text_length: usize,
    /// Directory audio artifacts are written to; empty means the process
    /// temp directory
    pub audio_output_dir: String,
    /// Deliver audio as inline base64 instead of a file path
    pub use_base64_audio: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_backend: "ai_voice".to_string(),
            timeout_secs: 60,
            max_text_length: 500,
            audio_output_dir: String::new(),
            use_base64_audio: false,
        }
    }
}

/// Probability gating for automatically-judged candidate replies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbabilityConfig {
    /// Whether probability gating is applied at all
    pub enabled: bool,
    /// Base chance in [0,1] that a candidate is spoken
    pub base_probability: f64,
    /// Whether force keywords override the probability draw
    pub keyword_force_trigger: bool,
    /// Keywords whose presence forces speech
    pub force_keywords: Vec<String>,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_probability: 0.3,
            keyword_force_trigger: true,
            force_keywords: vec![
                "语音".to_string(),
                "说话".to_string(),
                "朗读".to_string(),
                "读出来".to_string(),
                "voice".to_string(),
                "speak".to_string(),
            ],
        }
    }
}

/// AI Voice backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiVoiceConfig {
    /// Whether the backend is enabled
    pub enabled: bool,
    /// Default character name, resolved through the alias map
    pub default_character: String,
    /// Character name to platform voice id overrides; empty uses the
    /// built-in table
    pub alias_map: HashMap<String, String>,
}

impl Default for AiVoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_character: "温柔妹妹".to_string(),
            alias_map: HashMap::new(),
        }
    }
}

/// GSV2P cloud API backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Gsv2pConfig {
    /// Whether the backend is enabled
    pub enabled: bool,
    /// Speech endpoint URL
    pub api_url: String,
    /// Bearer token; mandatory when the backend is enabled
    pub api_token: String,
    /// Voice used when a request names none
    pub default_voice: String,
    /// Per-backend timeout in seconds; unset falls back to the global one
    pub timeout_secs: Option<u64>,
    /// Model identifier
    pub model: String,
    /// Response audio format (mp3, wav)
    pub response_format: String,
    /// Speech speed multiplier
    pub speed: f32,
    /// Text language hint passed to the API
    pub text_lang: String,
    /// Emotion preset passed to the API
    pub emotion: String,
}

impl Default for Gsv2pConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://gsv2p.acgnai.top/v1/audio/speech".to_string(),
            api_token: String::new(),
            default_voice: "原神-中文-派蒙_ZH".to_string(),
            timeout_secs: Some(30),
            model: "tts-v4".to_string(),
            response_format: "mp3".to_string(),
            speed: 1.0,
            text_lang: "中英混合".to_string(),
            emotion: "默认".to_string(),
        }
    }
}

/// One GPT-SoVITS voice style: reference audio plus prompt parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SovitsStyle {
    /// Reference audio path on the SoVITS server
    pub refer_wav: String,
    /// Transcript of the reference audio
    pub prompt_text: String,
    /// Language of the reference transcript
    pub prompt_language: String,
    /// Optional GPT weights to switch to before synthesis
    pub gpt_weights: Option<String>,
    /// Optional SoVITS weights to switch to before synthesis
    pub sovits_weights: Option<String>,
}

/// GPT-SoVITS backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GptSovitsConfig {
    /// Whether the backend is enabled
    pub enabled: bool,
    /// Base URL of the local GPT-SoVITS server
    pub server: String,
    /// Named styles; a usable "default" entry is mandatory when enabled
    pub styles: HashMap<String, SovitsStyle>,
    /// Per-backend timeout in seconds; unset falls back to the global one
    pub timeout_secs: Option<u64>,
}

impl Default for GptSovitsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "http://127.0.0.1:9880".to_string(),
            styles: HashMap::new(),
            timeout_secs: None,
        }
    }
}

/// Doubao backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DoubaoConfig {
    /// Whether the backend is enabled
    pub enabled: bool,
    /// Unidirectional streaming TTS endpoint
    pub api_url: String,
    /// Application id; mandatory when enabled
    pub app_id: String,
    /// Access key; mandatory when enabled
    pub access_key: String,
    /// Resource id; mandatory when enabled
    pub resource_id: String,
    /// Speaker used when a request names none
    pub default_voice: String,
    /// Per-backend timeout in seconds; unset falls back to the global one
    pub timeout_secs: Option<u64>,
    /// Output audio format (mp3, wav)
    pub audio_format: String,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output bitrate in bits per second
    pub bitrate: u32,
    /// Optional speech speed
    pub speed: Option<f32>,
    /// Optional speech volume
    pub volume: Option<f32>,
    /// Default tone-steering context texts
    pub context_texts: Option<Vec<String>>,
}

impl Default for DoubaoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://openspeech.bytedance.com/api/v3/tts/unidirectional".to_string(),
            app_id: String::new(),
            access_key: String::new(),
            resource_id: String::new(),
            default_voice: "zh_female_shuangkuaisisi_moon_bigtts".to_string(),
            timeout_secs: Some(30),
            audio_format: "mp3".to_string(),
            sample_rate: 24000,
            bitrate: 128000,
            speed: None,
            volume: None,
            context_texts: None,
        }
    }
}
