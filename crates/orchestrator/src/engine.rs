//! The pluggable LLM/TTS backend an incoming utterance is handed to.

use async_trait::async_trait;
use vocalis_foundation::{EngineError, Turn};

/// One chunk of PCM audio produced mid-stream by an engine, tagged with
/// its own format so the caller can feed it straight to a `Reformatter`
/// without assuming a fixed source rate.
pub struct AudioChunk<'a> {
    pub data: &'a [u8],
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// The result of one turn: the full assistant response text, plus the
/// subset of it (if any) the engine already identified as spoken-aloud
/// text while it was streaming audio. `None` means the caller should fall
/// back to the trimmed full response, matching the reference orchestrator's
/// own fallback when extraction finds nothing.
pub struct EngineResponse {
    pub text: String,
    pub voice_text: Option<String>,
}

/// A turn-processing backend: given the latest user utterance and prior
/// history, returns the full assistant response text, emitting zero or
/// more audio chunks to `on_audio_chunk` as they become available.
///
/// `on_audio_chunk` is a plain synchronous callback rather than a stream
/// so engines stay dyn-compatible under `#[async_trait]`.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn process(
        &self,
        text: &str,
        history: &[Turn],
        on_audio_chunk: &mut (dyn FnMut(AudioChunk<'_>) + Send),
    ) -> Result<EngineResponse, EngineError>;
}
