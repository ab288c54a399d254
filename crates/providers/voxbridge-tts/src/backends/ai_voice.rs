//! AI Voice backend
//!
//! Platform-native voice built into the hosting chat platform. No HTTP is
//! involved on this side: synthesis happens in the platform itself, so the
//! adapter only resolves the character alias and emits a host command for
//! the transport to forward. Group chats only.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::OnceLock;
use voxbridge_core::{AiVoiceConfig, Result, VoxError};

use crate::text::resolve_voice_alias;
use crate::types::{AudioOutput, TtsBackend};

/// Prefix of internal platform voice ids; names already carrying it skip
/// alias resolution
const VOICE_ID_PREFIX: &str = "lucy-voice-";

/// Built-in character alias table, used when the config supplies none
pub fn builtin_alias_map() -> &'static HashMap<String, String> {
    static MAP: OnceLock<HashMap<String, String>> = OnceLock::new();
    MAP.get_or_init(|| {
        [
            ("小新", "lucy-voice-laibixiaoxin"),
            ("猴哥", "lucy-voice-houge"),
            ("四郎", "lucy-voice-silang"),
            ("东北老妹儿", "lucy-voice-guangdong-f1"),
            ("广西大表哥", "lucy-voice-guangxi-m1"),
            ("妲己", "lucy-voice-daji"),
            ("霸道总裁", "lucy-voice-lizeyan"),
            ("酥心御姐", "lucy-voice-suxinjiejie"),
            ("说书先生", "lucy-voice-m8"),
            ("憨憨小弟", "lucy-voice-male1"),
            ("憨厚老哥", "lucy-voice-male3"),
            ("吕布", "lucy-voice-lvbu"),
            ("元气少女", "lucy-voice-xueling"),
            ("文艺少女", "lucy-voice-f37"),
            ("磁性大叔", "lucy-voice-male2"),
            ("邻家小妹", "lucy-voice-female1"),
            ("低沉男声", "lucy-voice-m14"),
            ("傲娇少女", "lucy-voice-f38"),
            ("爹系男友", "lucy-voice-m101"),
            ("暖心姐姐", "lucy-voice-female2"),
            ("温柔妹妹", "lucy-voice-f36"),
            ("书香少女", "lucy-voice-f34"),
        ]
        .iter()
        .map(|(name, id)| (name.to_string(), id.to_string()))
        .collect()
    })
}

/// Platform-native AI voice backend
pub struct AiVoiceBackend {
    config: AiVoiceConfig,
}

impl AiVoiceBackend {
    /// Create the backend from its configuration
    pub fn new(config: AiVoiceConfig) -> Self {
        Self { config }
    }

    fn alias_map(&self) -> &HashMap<String, String> {
        if self.config.alias_map.is_empty() {
            builtin_alias_map()
        } else {
            &self.config.alias_map
        }
    }
}

#[async_trait]
impl TtsBackend for AiVoiceBackend {
    fn id(&self) -> &'static str {
        "ai_voice"
    }

    fn supports_private_chat(&self) -> bool {
        false
    }

    fn default_voice(&self) -> String {
        self.config.default_character.clone()
    }

    fn resolve_voice(&self, voice: Option<&str>) -> Result<String> {
        resolve_voice_alias(
            voice,
            self.alias_map(),
            &self.config.default_character,
            VOICE_ID_PREFIX,
        )
        .ok_or_else(|| VoxError::UnknownVoice {
            backend: "ai_voice".to_string(),
            voice: voice.unwrap_or(&self.config.default_character).to_string(),
        })
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        _style: Option<&str>,
    ) -> Result<AudioOutput> {
        tracing::info!("AI voice command prepared (character: {})", voice_id);
        Ok(AudioOutput::HostCommand {
            text: text.to_string(),
            character: voice_id.to_string(),
        })
    }
}
