//! Doubao streaming response parser
//!
//! The unidirectional TTS endpoint answers with newline-delimited JSON
//! frames: `code=0` frames carry a base64 audio chunk (and sometimes
//! sentence metadata), `code=20000000` ends the stream, any positive code is
//! an error. Streamed WAV needs special care when merging: the first chunk
//! carries a header whose size fields are placeholders and may contain
//! LIST/INFO metadata pushing the `data` chunk past the canonical 44 bytes,
//! and some servers repeat the RIFF header on later chunks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

/// End-of-stream status code used by the API
const END_OF_STREAM_CODE: i64 = 20_000_000;

#[derive(Debug, Deserialize)]
struct DoubaoFrame {
    code: Option<i64>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Incremental parser for the newline-delimited frame stream
#[derive(Debug, Default)]
pub struct DoubaoStreamParser {
    chunks: Vec<Vec<u8>>,
    buffer: Vec<u8>,
    finished: bool,
    error: Option<String>,
}

impl DoubaoStreamParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the end-of-stream frame was seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one network chunk; frames are processed as complete lines arrive
    pub fn feed(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            self.process_line(line.trim());
        }
    }

    /// Flush any trailing frame and return the merged audio
    pub fn finish(mut self) -> Result<Vec<u8>, String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            self.process_line(line.trim());
        }

        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.is_finished() {
            // the connection may have dropped mid-stream; the audio we have
            // is still usable
            tracing::warn!("stream ended without an end-of-stream frame");
        }
        if self.chunks.is_empty() {
            return Err("stream contained no audio data".to_string());
        }
        Ok(Self::merge_chunks(&self.chunks))
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() || self.error.is_some() {
            return;
        }
        let frame: DoubaoFrame = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("skipping unparseable stream line: {}", e);
                return;
            }
        };

        match frame.code.unwrap_or(-1) {
            0 => {
                if let Some(encoded) = frame.data.as_deref() {
                    if let Some(audio) = Self::decode_audio(encoded) {
                        tracing::debug!(
                            "audio chunk #{} received ({} bytes)",
                            self.chunks.len() + 1,
                            audio.len()
                        );
                        self.chunks.push(audio);
                    }
                }
            }
            END_OF_STREAM_CODE => {
                tracing::debug!("end-of-stream frame received");
                self.finished = true;
            }
            code if code > 0 => {
                let message = frame
                    .message
                    .unwrap_or_else(|| format!("unknown error (code={})", code));
                tracing::error!("Doubao API error frame (code={}): {}", code, message);
                self.error = Some(message);
            }
            other => {
                tracing::debug!("unknown stream status code: {}", other);
            }
        }
    }

    fn decode_audio(encoded: &str) -> Option<Vec<u8>> {
        if encoded.is_empty() {
            return None;
        }
        // some frames arrive with the base64 padding stripped
        let mut padded = encoded.to_string();
        let rem = padded.len() % 4;
        if rem != 0 {
            padded.extend(std::iter::repeat('=').take(4 - rem));
        }
        match STANDARD.decode(&padded) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("base64 decode of audio chunk failed: {}", e);
                None
            }
        }
    }

    /// Find where audio data starts inside a WAV header, skipping any
    /// metadata chunks before the `data` chunk
    fn find_data_chunk_offset(header: &[u8]) -> usize {
        let mut pos = 12; // RIFF(4) + size(4) + WAVE(4)
        while pos + 8 <= header.len() {
            let chunk_id = &header[pos..pos + 4];
            let chunk_size = u32::from_le_bytes([
                header[pos + 4],
                header[pos + 5],
                header[pos + 6],
                header[pos + 7],
            ]) as usize;
            if chunk_id == b"data" {
                return pos + 8;
            }
            pos = pos.saturating_add(8 + chunk_size);
            // chunks are aligned to even byte boundaries
            if chunk_size % 2 == 1 {
                pos += 1;
            }
        }
        44
    }

    fn merge_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
        let first = match chunks.first() {
            Some(first) => first,
            None => return Vec::new(),
        };

        // non-WAV formats (mp3) concatenate directly
        if first.len() < 44 || &first[..4] != b"RIFF" {
            return chunks.concat();
        }

        let data_offset = Self::find_data_chunk_offset(first).min(first.len());
        let mut header = first[..data_offset].to_vec();
        let mut audio: Vec<u8> = first[data_offset..].to_vec();

        for chunk in &chunks[1..] {
            if chunk.len() > 44 && &chunk[..4] == b"RIFF" {
                // repeated header on a later chunk; keep only its audio
                let offset = Self::find_data_chunk_offset(chunk).min(chunk.len());
                audio.extend_from_slice(&chunk[offset..]);
            } else {
                audio.extend_from_slice(chunk);
            }
        }

        // the streaming header carries placeholder sizes; patch both fields
        let file_size = (header.len() - 8 + audio.len()) as u32;
        header[4..8].copy_from_slice(&file_size.to_le_bytes());
        if data_offset >= 4 {
            let audio_size = audio.len() as u32;
            header[data_offset - 4..data_offset].copy_from_slice(&audio_size.to_le_bytes());
        }

        header.extend_from_slice(&audio);
        header
    }
}
