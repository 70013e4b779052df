use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared counters for cross-task pipeline monitoring. Each field is an
/// independent atomic so any task can update it without a lock.
#[derive(Clone)]
pub struct PipelineMetrics {
    pub frames_captured: Arc<AtomicU64>,
    pub packets_emitted: Arc<AtomicU64>,
    pub packets_dropped: Arc<AtomicU64>,
    pub status_transitions: Arc<AtomicU64>,

    pub utterances_segmented: Arc<AtomicU64>,
    pub transcriptions_started: Arc<AtomicU64>,
    pub transcriptions_completed: Arc<AtomicU64>,
    pub transcriptions_cancelled: Arc<AtomicU64>,
    pub transcriptions_failed: Arc<AtomicU64>,

    pub turns_processed: Arc<AtomicU64>,
    pub engine_errors: Arc<AtomicU64>,
    pub resets_handled: Arc<AtomicU64>,

    pub last_drop_log: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            frames_captured: Arc::new(AtomicU64::new(0)),
            packets_emitted: Arc::new(AtomicU64::new(0)),
            packets_dropped: Arc::new(AtomicU64::new(0)),
            status_transitions: Arc::new(AtomicU64::new(0)),
            utterances_segmented: Arc::new(AtomicU64::new(0)),
            transcriptions_started: Arc::new(AtomicU64::new(0)),
            transcriptions_completed: Arc::new(AtomicU64::new(0)),
            transcriptions_cancelled: Arc::new(AtomicU64::new(0)),
            transcriptions_failed: Arc::new(AtomicU64::new(0)),
            turns_processed: Arc::new(AtomicU64::new(0)),
            engine_errors: Arc::new(AtomicU64::new(0)),
            resets_handled: Arc::new(AtomicU64::new(0)),
            last_drop_log: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dropped_packet(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Logs the current drop count at most once per `interval`, matching
    /// the "dropped-count statistics every 5s" requirement on Voice-Input.
    pub fn maybe_log_drops(&self, interval: Duration) {
        let now = Instant::now();
        let should_log = {
            let guard = self.last_drop_log.read();
            match *guard {
                Some(last) => now.duration_since(last) >= interval,
                None => true,
            }
        };
        if should_log {
            *self.last_drop_log.write() = Some(now);
            let dropped = self.packets_dropped.load(Ordering::Relaxed);
            let emitted = self.packets_emitted.load(Ordering::Relaxed);
            tracing::info!(dropped, emitted, "voice-input egress statistics");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_counter_accumulates() {
        let m = PipelineMetrics::new();
        m.record_dropped_packet();
        m.record_dropped_packet();
        assert_eq!(m.packets_dropped.load(Ordering::Relaxed), 2);
    }
}
