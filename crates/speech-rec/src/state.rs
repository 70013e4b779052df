use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use vocalis_proto::VadPacket;
use vocalis_stt::{AsrEngine, SpeechSegmenter, TranscriptionSlot, UtteranceBuffer};
use vocalis_telemetry::PipelineMetrics;

const QUEUE_CAPACITY: usize = 100;

/// Per-client receive queue for incoming `VadPacket`s. Bounded at 100;
/// on overflow the oldest queued packet is evicted before the new one
/// is inserted.
pub struct PacketQueue {
    inner: Mutex<VecDeque<VadPacket>>,
    notify: Notify,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, packet: VadPacket, metrics: &PipelineMetrics) {
        let mut queue = self.inner.lock();
        if queue.len() >= QUEUE_CAPACITY {
            queue.pop_front();
            metrics.record_dropped_packet();
        }
        queue.push_back(packet);
        drop(queue);
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> VadPacket {
        loop {
            if let Some(packet) = self.inner.lock().pop_front() {
                return packet;
            }
            self.notify.notified().await;
        }
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// All state shared across the control/audio/text port tasks.
pub struct SpeechRecState {
    pub segmenter: Mutex<SpeechSegmenter>,
    pub buffer: UtteranceBuffer,
    pub worker: TranscriptionSlot,
    pub engine: Arc<dyn AsrEngine>,
    pub queue: PacketQueue,
    pub text_sink: Mutex<Option<mpsc::Sender<String>>>,
    pub metrics: PipelineMetrics,
    warned_format_mismatch: AtomicBool,
}

impl SpeechRecState {
    pub fn new(engine: Arc<dyn AsrEngine>) -> Arc<Self> {
        Arc::new(Self {
            segmenter: Mutex::new(SpeechSegmenter::new()),
            buffer: UtteranceBuffer::new(),
            worker: TranscriptionSlot::new(),
            engine,
            queue: PacketQueue::new(),
            text_sink: Mutex::new(None),
            metrics: PipelineMetrics::new(),
            warned_format_mismatch: AtomicBool::new(false),
        })
    }

    /// Logs a format-mismatch warning exactly once, per the "sample-rate
    /// mismatch is logged once" invariant.
    pub fn warn_format_mismatch_once(&self, channels: u32, sample_rate: u32) {
        if !self.warned_format_mismatch.swap(true, Ordering::Relaxed) {
            tracing::warn!(channels, sample_rate, "audio packet format mismatch, samples discarded");
        }
    }

    pub fn emit_text(&self, text: String, is_final: bool) {
        let line = serde_json::json!({ "text": text, "is_final": is_final }).to_string();
        let sink = self.text_sink.lock().clone();
        match sink {
            Some(tx) => {
                if tx.try_send(line).is_err() {
                    tracing::warn!("text client channel full or disconnected, dropping line");
                }
            }
            None => tracing::debug!("no text client connected, discarding transcription"),
        }
    }
}
