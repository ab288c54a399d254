//! Doubao (ByteDance) backend
//!
//! Streaming speech API. The response arrives as newline-delimited JSON
//! frames carrying base64 audio chunks; parsing and merging live in
//! [`super::doubao_stream`]. Tone is steered through `context_texts`, with a
//! built-in map from emotion keywords to steering sentences.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;
use voxbridge_core::{DoubaoConfig, Result, VoxError};

use super::doubao_stream::DoubaoStreamParser;
use crate::types::{validate_audio_data, AudioFormat, AudioOutput, TtsBackend};

/// Emotion keywords mapped to tone-steering context texts
const EMOTION_MAP: &[(&str, &str)] = &[
    ("开心", "你的语气再欢乐一点"),
    ("兴奋", "用特别兴奋激动的语气说话"),
    ("温柔", "用温柔体贴的语气说话"),
    ("骄傲", "用骄傲的语气说话"),
    ("自信", "用自信坚定的语气说话"),
    ("生气", "你得跟我互怼！就是跟我用吵架的语气对话"),
    ("愤怒", "用愤怒的语气说话"),
    ("伤心", "用特别特别痛心的语气说话"),
    ("失望", "用失望沮丧的语气说话"),
    ("委屈", "用委屈的语气说话"),
    ("平静", "用平静淡定的语气说话"),
    ("严肃", "用严肃认真的语气说话"),
    ("疑惑", "用疑惑不解的语气说话"),
    ("慢速", "说慢一点"),
    ("快速", "说快一点"),
    ("小声", "你嗓门再小点"),
    ("大声", "大声一点"),
];

static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn client() -> &'static Client {
    HTTP_CLIENT.get_or_init(Client::new)
}

#[derive(Debug, Serialize)]
struct DoubaoRequest<'a> {
    req_params: DoubaoReqParams<'a>,
}

#[derive(Debug, Serialize)]
struct DoubaoReqParams<'a> {
    text: &'a str,
    speaker: &'a str,
    audio_params: DoubaoAudioParams<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_texts: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct DoubaoAudioParams<'a> {
    format: &'a str,
    sample_rate: u32,
    bitrate: u32,
}

/// Doubao streaming API backend
pub struct DoubaoBackend {
    config: DoubaoConfig,
}

impl DoubaoBackend {
    /// Create the backend from its configuration
    pub fn new(config: DoubaoConfig) -> Self {
        Self { config }
    }

    /// Map an emotion keyword to context texts, falling back to the
    /// configured defaults
    fn resolve_context_texts(&self, style: Option<&str>) -> Option<Vec<String>> {
        if let Some(keyword) = style {
            if let Some((_, steer)) = EMOTION_MAP.iter().find(|(k, _)| *k == keyword) {
                return Some(vec![steer.to_string()]);
            }
        }
        self.config.context_texts.clone()
    }

    fn build_request<'a>(
        &'a self,
        text: &'a str,
        voice_id: &'a str,
        style: Option<&str>,
    ) -> DoubaoRequest<'a> {
        DoubaoRequest {
            req_params: DoubaoReqParams {
                text,
                speaker: voice_id,
                audio_params: DoubaoAudioParams {
                    format: &self.config.audio_format,
                    sample_rate: self.config.sample_rate,
                    bitrate: self.config.bitrate,
                },
                speed: self.config.speed,
                volume: self.config.volume,
                context_texts: self.resolve_context_texts(style),
            },
        }
    }
}

#[async_trait]
impl TtsBackend for DoubaoBackend {
    fn id(&self) -> &'static str {
        "doubao"
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.app_id.is_empty()
            || self.config.access_key.is_empty()
            || self.config.resource_id.is_empty()
        {
            return Err(VoxError::config(
                "Doubao backend requires app_id, access_key and resource_id",
            ));
        }
        Ok(())
    }

    fn default_voice(&self) -> String {
        self.config.default_voice.clone()
    }

    fn resolve_voice(&self, voice: Option<&str>) -> Result<String> {
        // speaker ids are validated server-side; pass through
        Ok(voice.unwrap_or(&self.config.default_voice).to_string())
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        style: Option<&str>,
    ) -> Result<AudioOutput> {
        let request = self.build_request(text, voice_id, style);
        tracing::debug!(
            "Doubao request: speaker={}, format={}, text_len={}",
            voice_id,
            self.config.audio_format,
            text.chars().count()
        );

        let response = client()
            .post(&self.config.api_url)
            .header("X-Api-App-Id", &self.config.app_id)
            .header("X-Api-Access-Key", &self.config.access_key)
            .header("X-Api-Resource-Id", &self.config.resource_id)
            .header("X-Api-Request-Id", Uuid::new_v4().to_string())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(100).collect();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(VoxError::backend_config(format!(
                    "Doubao authentication failed ({}): {}",
                    status, detail
                )));
            }
            return Err(VoxError::unavailable(format!(
                "Doubao API error ({}): {}",
                status, detail
            )));
        }

        let mut parser = DoubaoStreamParser::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            parser.feed(&chunk?);
        }

        let audio = parser
            .finish()
            .map_err(|e| VoxError::unavailable(format!("Doubao stream error: {}", e)))?;
        tracing::debug!("Doubao response merged: {} bytes", audio.len());
        validate_audio_data(&audio)?;
        Ok(AudioOutput::Bytes {
            data: Bytes::from(audio),
            format: AudioFormat::from_name(&self.config.audio_format),
        })
    }
}
