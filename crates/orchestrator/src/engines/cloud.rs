//! Cloud TTS engine: posts the raw query to a hosted voice API, decodes the
//! MP3 response, and forwards fixed-size PCM chunks to the caller.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use vocalis_foundation::{EngineError, Turn};

use crate::engine::{AudioChunk, Engine, EngineResponse};

const CHUNK_SIZE: usize = 4096;

pub struct CloudEngine {
    http: reqwest::Client,
    api_url: String,
    voice_id: String,
    tenant_id: Option<String>,
}

impl CloudEngine {
    pub fn new(api_url: String, voice_id: String, tenant_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            voice_id,
            tenant_id,
        }
    }
}

#[async_trait]
impl Engine for CloudEngine {
    async fn process(
        &self,
        text: &str,
        _history: &[Turn],
        on_audio_chunk: &mut (dyn FnMut(AudioChunk<'_>) + Send),
    ) -> Result<EngineResponse, EngineError> {
        let mut payload = json!({"query": text, "voiceId": self.voice_id});
        if let Some(tenant_id) = &self.tenant_id {
            payload["tenantId"] = json!(tenant_id);
        }

        tracing::info!(url = %self.api_url, "calling cloud voice API");
        let response = self
            .http
            .post(&self.api_url)
            .json(&payload)
            .header("Accept", "audio/mpeg")
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| EngineError::Http(err.to_string()))?;

        let mut mp3_bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| EngineError::Http(err.to_string()))?;
            mp3_bytes.extend_from_slice(&chunk);
        }

        if mp3_bytes.is_empty() {
            return Ok(EngineResponse {
                text: String::new(),
                voice_text: None,
            });
        }

        let (pcm, sample_rate, channels) = decode_mp3(&mp3_bytes)?;
        for frame in pcm.chunks(CHUNK_SIZE) {
            on_audio_chunk(AudioChunk {
                data: frame,
                sample_rate,
                channels,
                bits_per_sample: 16,
            });
        }

        Ok(EngineResponse {
            text: "The cloud response has been played.".to_string(),
            voice_text: None,
        })
    }
}

/// Decodes a whole in-memory MP3 buffer into interleaved 16-bit PCM,
/// returning the sample rate and channel count of the first decoded frame.
fn decode_mp3(mp3_bytes: &[u8]) -> Result<(Vec<u8>, u32, u16), EngineError> {
    let mut decoder = minimp3::Decoder::new(std::io::Cursor::new(mp3_bytes));
    let mut pcm = Vec::new();
    let mut format: Option<(u32, u16)> = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                format.get_or_insert((frame.sample_rate as u32, frame.channels as u16));
                pcm.extend(frame.data.iter().flat_map(|s| s.to_le_bytes()));
            }
            Err(minimp3::Error::Eof) => break,
            Err(err) => {
                tracing::error!("mp3 decode error: {err}");
                break;
            }
        }
    }

    let (sample_rate, channels) = format.ok_or_else(|| {
        EngineError::Http("cloud voice API returned no decodable mp3 frames".to_string())
    })?;
    Ok((pcm, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_mp3_rejects_garbage_input() {
        let err = decode_mp3(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, EngineError::Http(_)));
    }

    #[test]
    fn chunk_size_matches_reference_streaming_granularity() {
        assert_eq!(CHUNK_SIZE, 4096);
    }
}
