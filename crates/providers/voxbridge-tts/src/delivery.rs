//! Audio delivery
//!
//! Converts a [`SpeechResult`] into the form a chat transport can actually
//! send: a file path on shared storage, or inline base64 for transports
//! without filesystem access. Files are written to a temporary name first
//! and renamed into place so a concurrent reader never observes a partial
//! artifact. Platform-native voice commands pass through untouched.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;
use voxbridge_core::{GeneralConfig, Result, VoxError};

use crate::types::{AudioFormat, AudioOutput, DeliveryPayload, SpeechResult};

/// Default timeout for fetching remotely hosted audio
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn client() -> &'static Client {
    HTTP_CLIENT.get_or_init(Client::new)
}

/// Delivery-relevant settings, extracted from the general configuration
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Directory audio files are written to; empty means the system temp dir
    pub audio_output_dir: String,
    /// Emit inline base64 instead of file paths
    pub use_base64_audio: bool,
    /// Timeout for fetching remotely hosted audio
    pub fetch_timeout: Duration,
}

impl From<&GeneralConfig> for DeliveryConfig {
    fn from(general: &GeneralConfig) -> Self {
        Self {
            audio_output_dir: general.audio_output_dir.clone(),
            use_base64_audio: general.use_base64_audio,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Resolves synthesized audio into a transport-ready payload
pub struct DeliveryResolver {
    config: DeliveryConfig,
}

impl DeliveryResolver {
    /// Create a resolver with the given settings
    pub fn new(config: DeliveryConfig) -> Self {
        Self { config }
    }

    /// Resolve one speech result; consumes it
    pub async fn resolve(&self, result: SpeechResult) -> Result<DeliveryPayload> {
        let backend = result.source_backend;
        match result.audio {
            AudioOutput::HostCommand { text, character } => {
                Ok(DeliveryPayload::HostVoice { text, character })
            }
            AudioOutput::Bytes { data, format } => {
                self.materialize(&backend, data, format).await
            }
            AudioOutput::Remote { url, format } => {
                let data = self.fetch(&url).await?;
                self.materialize(&backend, data, format).await
            }
        }
    }

    async fn materialize(
        &self,
        backend: &str,
        data: Bytes,
        format: AudioFormat,
    ) -> Result<DeliveryPayload> {
        if self.config.use_base64_audio {
            return Ok(DeliveryPayload::Base64 {
                data: STANDARD.encode(&data),
                mime: format.mime_type(),
            });
        }

        let path = self.write_file(backend, &data, format).await?;
        Ok(DeliveryPayload::FilePath {
            path,
            mime: format.mime_type(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        tracing::debug!("fetching remote audio: {}", url);
        let response = client()
            .get(url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .map_err(|e| VoxError::delivery_fetch(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(VoxError::delivery_fetch(format!(
                "remote audio fetch returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| VoxError::delivery_fetch(format!("reading body of {} failed: {}", url, e)))
    }

    fn output_dir(&self) -> PathBuf {
        if self.config.audio_output_dir.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.config.audio_output_dir)
        }
    }

    /// Write audio to a uniquely-named file; tmp-write then rename so the
    /// final path only ever names a complete file
    async fn write_file(&self, backend: &str, data: &[u8], format: AudioFormat) -> Result<PathBuf> {
        let dir = self.output_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| VoxError::delivery_write(format!("creating {}: {}", dir.display(), e)))?;

        let stem = Uuid::new_v4().simple().to_string();
        let name = format!("tts_{}_{}.{}", backend, &stem[..12], format.extension());
        let path = dir.join(&name);
        let tmp = dir.join(format!("{}.tmp", name));

        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| VoxError::delivery_write(format!("writing {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| VoxError::delivery_write(format!("renaming to {}: {}", path.display(), e)))?;

        tracing::debug!("audio written: {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_bytes(data: &'static [u8]) -> SpeechResult {
        SpeechResult {
            audio: AudioOutput::Bytes {
                data: Bytes::from_static(data),
                format: AudioFormat::Mp3,
            },
            source_backend: "gsv2p".to_string(),
            duration_hint: None,
        }
    }

    fn resolver(dir: &str, base64: bool) -> DeliveryResolver {
        DeliveryResolver::new(DeliveryConfig {
            audio_output_dir: dir.to_string(),
            use_base64_audio: base64,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    fn test_dir(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("voxbridge_delivery_{}", tag))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn test_bytes_become_file() {
        let dir = test_dir("file");
        let payload = resolver(&dir, false)
            .resolve(result_with_bytes(&[7u8; 256]))
            .await
            .unwrap();

        match payload {
            DeliveryPayload::FilePath { path, mime } => {
                assert_eq!(mime, "audio/mpeg");
                let name = path.file_name().unwrap().to_string_lossy();
                assert!(name.starts_with("tts_gsv2p_"));
                assert!(name.ends_with(".mp3"));
                assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![7u8; 256]);
            }
            other => panic!("expected file path, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_base64_mode_never_touches_disk() {
        // base64 wins even with an output dir configured
        let payload = resolver("/nonexistent/never/created", true)
            .resolve(result_with_bytes(&[1u8; 128]))
            .await
            .unwrap();

        match payload {
            DeliveryPayload::Base64 { data, mime } => {
                assert_eq!(mime, "audio/mpeg");
                assert_eq!(STANDARD.decode(&data).unwrap(), vec![1u8; 128]);
            }
            other => panic!("expected base64, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_host_command_passes_through() {
        let result = SpeechResult {
            audio: AudioOutput::HostCommand {
                text: "你好".to_string(),
                character: "lucy-voice-xueling".to_string(),
            },
            source_backend: "ai_voice".to_string(),
            duration_hint: None,
        };
        // base64 mode must not affect host commands either
        let payload = resolver("", true).resolve(result).await.unwrap();
        assert_eq!(
            payload,
            DeliveryPayload::HostVoice {
                text: "你好".to_string(),
                character: "lucy-voice-xueling".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_writes_get_distinct_paths() {
        let dir = test_dir("concurrent");
        let resolver = std::sync::Arc::new(resolver(&dir, false));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver.resolve(result_with_bytes(&[3u8; 200])).await
            }));
        }

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                DeliveryPayload::FilePath { path, .. } => {
                    assert!(paths.insert(path));
                }
                other => panic!("expected file path, got {:?}", other),
            }
        }
        assert_eq!(paths.len(), 8);
    }

    #[tokio::test]
    async fn test_no_tmp_residue() {
        let dir = test_dir("tmpresidue");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        resolver(&dir, false)
            .resolve(result_with_bytes(&[5u8; 150]))
            .await
            .unwrap();

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name();
            assert!(
                !name.to_string_lossy().ends_with(".tmp"),
                "leftover temp file: {:?}",
                name
            );
        }
    }
}
