//! GPT-SoVITS backend
//!
//! Local reference-conditioned synthesis server. A request is a named style:
//! reference audio, its transcript, and optionally GPT/SoVITS model weights
//! the server is switched to before synthesis. The text language is
//! detected here because the server needs an explicit hint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;
use voxbridge_core::{GptSovitsConfig, Result, SovitsStyle, VoxError};

use crate::text::detect_language;
use crate::types::{validate_audio_data, AudioFormat, AudioOutput, TtsBackend};

/// Style every configuration must provide
const DEFAULT_STYLE: &str = "default";

static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn client() -> &'static Client {
    HTTP_CLIENT.get_or_init(Client::new)
}

#[derive(Debug, Serialize)]
struct SovitsRequest<'a> {
    text: &'a str,
    text_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_audio_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_lang: Option<&'a str>,
}

/// Local GPT-SoVITS server backend
pub struct GptSovitsBackend {
    config: GptSovitsConfig,
}

impl GptSovitsBackend {
    /// Create the backend from its configuration
    pub fn new(config: GptSovitsConfig) -> Self {
        Self { config }
    }

    fn tts_url(&self) -> String {
        let base = self.config.server.trim_end_matches('/');
        if base.ends_with("/tts") {
            base.to_string()
        } else {
            format!("{}/tts", base)
        }
    }

    fn style(&self, name: &str) -> Result<&SovitsStyle> {
        let style = self
            .config
            .styles
            .get(name)
            .ok_or_else(|| VoxError::UnknownVoice {
                backend: "gpt_sovits".to_string(),
                voice: name.to_string(),
            })?;
        if style.refer_wav.is_empty() || style.prompt_text.is_empty() {
            return Err(VoxError::backend_config(format!(
                "GPT-SoVITS style '{}' is incomplete (refer_wav and prompt_text are required)",
                name
            )));
        }
        Ok(style)
    }

    /// Point the server at a different weights file before synthesis
    async fn switch_weights(&self, endpoint: &str, weights_path: &str) -> Result<()> {
        let url = format!("{}/{}", self.config.server.trim_end_matches('/'), endpoint);
        let response = client()
            .get(&url)
            .query(&[("weights_path", weights_path)])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            return Err(VoxError::backend_config(format!(
                "GPT-SoVITS weight switch {} failed ({}): {}",
                endpoint, status, detail
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TtsBackend for GptSovitsBackend {
    fn id(&self) -> &'static str {
        "gpt_sovits"
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    fn validate_config(&self) -> Result<()> {
        let default = self.config.styles.get(DEFAULT_STYLE).ok_or_else(|| {
            VoxError::config("GPT-SoVITS backend requires a 'default' style")
        })?;
        if default.refer_wav.is_empty() || default.prompt_text.is_empty() {
            return Err(VoxError::config(
                "GPT-SoVITS 'default' style is incomplete (refer_wav and prompt_text are required)",
            ));
        }
        Ok(())
    }

    fn default_voice(&self) -> String {
        DEFAULT_STYLE.to_string()
    }

    fn resolve_voice(&self, voice: Option<&str>) -> Result<String> {
        // unknown style names degrade to the default style
        let name = match voice {
            Some(v) if self.config.styles.contains_key(v) => v,
            _ => DEFAULT_STYLE,
        };
        if !self.config.styles.contains_key(name) {
            return Err(VoxError::UnknownVoice {
                backend: "gpt_sovits".to_string(),
                voice: name.to_string(),
            });
        }
        Ok(name.to_string())
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        style: Option<&str>,
    ) -> Result<AudioOutput> {
        // an explicit style wins over the resolved voice when both are named
        let style_name = match style {
            Some(s) if self.config.styles.contains_key(s) => s,
            _ => voice_id,
        };
        let style_config = self.style(style_name)?;

        if let Some(weights) = style_config.gpt_weights.as_deref() {
            self.switch_weights("set_gpt_weights", weights).await?;
        }
        if let Some(weights) = style_config.sovits_weights.as_deref() {
            self.switch_weights("set_sovits_weights", weights).await?;
        }

        let text_lang = detect_language(text);
        let prompt_lang = if style_config.prompt_language.is_empty() {
            "zh"
        } else {
            &style_config.prompt_language
        };
        let request = SovitsRequest {
            text,
            text_lang,
            ref_audio_path: Some(&style_config.refer_wav),
            prompt_text: Some(&style_config.prompt_text),
            prompt_lang: Some(prompt_lang),
        };

        tracing::debug!(
            "GPT-SoVITS request: style={}, text_lang={}, text_len={}",
            style_name,
            text_lang,
            text.chars().count()
        );

        let response = client().post(self.tts_url()).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            return Err(VoxError::unavailable(format!(
                "GPT-SoVITS API error ({}): {}",
                status, detail
            )));
        }

        let data = response.bytes().await?;
        tracing::debug!("GPT-SoVITS response: {} bytes", data.len());
        validate_audio_data(&data)?;
        Ok(AudioOutput::Bytes {
            data,
            format: AudioFormat::Wav,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn style(refer_wav: &str, prompt_text: &str) -> SovitsStyle {
        SovitsStyle {
            refer_wav: refer_wav.to_string(),
            prompt_text: prompt_text.to_string(),
            prompt_language: "zh".to_string(),
            gpt_weights: None,
            sovits_weights: None,
        }
    }

    fn config_with_styles(styles: HashMap<String, SovitsStyle>) -> GptSovitsConfig {
        GptSovitsConfig {
            enabled: true,
            styles,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_default_style() {
        let backend = GptSovitsBackend::new(config_with_styles(HashMap::new()));
        assert!(backend.validate_config().is_err());

        let backend = GptSovitsBackend::new(config_with_styles(
            [("default".to_string(), style("", ""))].into(),
        ));
        assert!(backend.validate_config().is_err());

        let backend = GptSovitsBackend::new(config_with_styles(
            [("default".to_string(), style("/ref/a.wav", "你好"))].into(),
        ));
        assert!(backend.validate_config().is_ok());
    }

    #[test]
    fn test_unknown_style_degrades_to_default() {
        let backend = GptSovitsBackend::new(config_with_styles(
            [
                ("default".to_string(), style("/ref/a.wav", "你好")),
                ("温柔".to_string(), style("/ref/b.wav", "晚安")),
            ]
            .into(),
        ));
        assert_eq!(backend.resolve_voice(Some("温柔")).unwrap(), "温柔");
        assert_eq!(backend.resolve_voice(Some("不存在")).unwrap(), "default");
        assert_eq!(backend.resolve_voice(None).unwrap(), "default");
    }

    #[test]
    fn test_resolve_without_default_style_fails() {
        let backend = GptSovitsBackend::new(config_with_styles(
            [("温柔".to_string(), style("/ref/b.wav", "晚安"))].into(),
        ));
        assert!(matches!(
            backend.resolve_voice(None),
            Err(VoxError::UnknownVoice { .. })
        ));
    }

    #[test]
    fn test_tts_url_joining() {
        let mut config = config_with_styles(HashMap::new());
        config.server = "http://127.0.0.1:9880/".to_string();
        assert_eq!(GptSovitsBackend::new(config.clone()).tts_url(), "http://127.0.0.1:9880/tts");
        config.server = "http://127.0.0.1:9880/tts".to_string();
        assert_eq!(GptSovitsBackend::new(config).tts_url(), "http://127.0.0.1:9880/tts");
    }

    #[test]
    fn test_request_shape() {
        let request = SovitsRequest {
            text: "你好",
            text_lang: "zh",
            ref_audio_path: Some("/ref/a.wav"),
            prompt_text: Some("早上好"),
            prompt_lang: Some("zh"),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["text"], "你好");
        assert_eq!(value["text_lang"], "zh");
        assert_eq!(value["ref_audio_path"], "/ref/a.wav");
        assert_eq!(value["prompt_lang"], "zh");
    }
}
