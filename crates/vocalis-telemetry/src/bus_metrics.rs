use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the pub/sub bus transport (connect/disconnect churn, frames
/// in each direction).
#[derive(Clone, Default)]
pub struct BusMetrics {
    pub subscribers_connected: Arc<AtomicU64>,
    pub publish_failures: Arc<AtomicU64>,
    pub frames_published: Arc<AtomicU64>,
    pub frames_received: Arc<AtomicU64>,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_publish_ok(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_publish_err(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }
}
