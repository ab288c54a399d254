//! GSV2P backend
//!
//! Cloud speech API with an OpenAI-compatible surface. Requires a bearer
//! token; the endpoint sometimes answers 200 with a JSON error body instead
//! of audio, so the content type is checked before the bytes are trusted.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use voxbridge_core::{Gsv2pConfig, Result, VoxError};

use crate::types::{validate_audio_data, AudioFormat, AudioOutput, TtsBackend};

/// Shared HTTP client for connection pooling; the dispatcher owns the
/// per-request timeout
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn client() -> &'static Client {
    HTTP_CLIENT.get_or_init(Client::new)
}

#[derive(Debug, Serialize)]
struct Gsv2pRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
    other_params: Gsv2pOtherParams<'a>,
}

#[derive(Debug, Serialize)]
struct Gsv2pOtherParams<'a> {
    text_lang: &'a str,
    emotion: &'a str,
}

#[derive(Debug, Deserialize)]
struct Gsv2pErrorResponse {
    #[serde(default)]
    error: Option<Gsv2pErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Gsv2pErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// GSV2P cloud API backend
pub struct Gsv2pBackend {
    config: Gsv2pConfig,
}

impl Gsv2pBackend {
    /// Create the backend from its configuration
    pub fn new(config: Gsv2pConfig) -> Self {
        Self { config }
    }

    fn build_request<'a>(
        &'a self,
        text: &'a str,
        voice_id: &'a str,
        style: Option<&'a str>,
    ) -> Gsv2pRequest<'a> {
        Gsv2pRequest {
            model: &self.config.model,
            input: text,
            voice: voice_id,
            response_format: &self.config.response_format,
            speed: self.config.speed,
            other_params: Gsv2pOtherParams {
                text_lang: &self.config.text_lang,
                emotion: style.unwrap_or(&self.config.emotion),
            },
        }
    }
}

#[async_trait]
impl TtsBackend for Gsv2pBackend {
    fn id(&self) -> &'static str {
        "gsv2p"
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.api_token.is_empty() {
            return Err(VoxError::config("GSV2P backend requires an api_token"));
        }
        Ok(())
    }

    fn default_voice(&self) -> String {
        self.config.default_voice.clone()
    }

    fn resolve_voice(&self, voice: Option<&str>) -> Result<String> {
        // the voice catalog lives cloud-side; any name is passed through
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
            "GSV2P request: voice={}, model={}, text_len={}",
            voice_id,
            self.config.model,
            text.chars().count()
        );

        let response = client()
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_token)
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(100).collect();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(VoxError::backend_config(format!(
                    "GSV2P authentication failed ({}): {}",
                    status, detail
                )));
            }
            return Err(VoxError::unavailable(format!(
                "GSV2P API error ({}): {}",
                status, detail
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let data = response.bytes().await?;
        tracing::debug!("GSV2P response: content_type={}, {} bytes", content_type, data.len());

        // 200 with a JSON body is an in-band error, not audio
        if content_type.contains("application/json") {
            let message = serde_json::from_slice::<Gsv2pErrorResponse>(&data)
                .ok()
                .and_then(|e| e.error.and_then(|b| b.message))
                .unwrap_or_else(|| String::from_utf8_lossy(&data).chars().take(200).collect());
            return Err(VoxError::unavailable(format!("GSV2P API error: {}", message)));
        }

        validate_audio_data(&data)?;
        Ok(AudioOutput::Bytes {
            data,
            format: AudioFormat::from_name(&self.config.response_format),
        })
    }
}
