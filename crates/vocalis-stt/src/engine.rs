use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The one-method ASR interface: transcribe a full utterance snapshot,
/// checking `cancel` so a slow call can be abandoned between internal
/// steps rather than only at entry.
#[async_trait]
pub trait AsrEngine: Send + Sync {
    async fn transcribe(&self, samples: &[f32], cancel: &Arc<AtomicBool>) -> Result<String, String>;
}

/// Deterministic engine for tests: returns a fixed or injectable
/// string, never touches the network or a model.
pub struct MockAsrEngine {
    text: parking_lot::Mutex<String>,
}

impl MockAsrEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: parking_lot::Mutex::new(text.into()),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.lock() = text.into();
    }
}

impl Default for MockAsrEngine {
    fn default() -> Self {
        Self::new("mock transcription")
    }
}

#[async_trait]
impl AsrEngine for MockAsrEngine {
    async fn transcribe(&self, _samples: &[f32], cancel: &Arc<AtomicBool>) -> Result<String, String> {
        if cancel.load(Ordering::SeqCst) {
            return Err("cancelled before transcription started".to_string());
        }
        Ok(self.text.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_configured_text() {
        let engine = MockAsrEngine::new("hello world");
        let cancel = Arc::new(AtomicBool::new(false));
        let out = engine.transcribe(&[0.0; 10], &cancel).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn mock_respects_cancel_flag() {
        let engine = MockAsrEngine::default();
        let cancel = Arc::new(AtomicBool::new(true));
        assert!(engine.transcribe(&[0.0; 10], &cancel).await.is_err());
    }
}
