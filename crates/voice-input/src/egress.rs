//! Background reconnect loop writing framed `VadPacket`s to Speech-Rec's
//! audio port. Packets produced while disconnected are dropped, never
//! queued unbounded, matching the rest of this pipeline's backpressure
//! policy.

use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use vocalis_telemetry::PipelineMetrics;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);
const DROP_LOG_INTERVAL: Duration = Duration::from_secs(5);

pub struct Egress {
    tx: mpsc::Sender<Vec<u8>>,
}

impl Egress {
    /// Starts the background connection task and returns a handle that
    /// accepts already-framed bytes.
    pub fn spawn(addr: String, metrics: PipelineMetrics) -> Self {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(run(addr, rx, metrics));
        Self { tx }
    }

    /// Enqueues one framed packet. Drops it (and records the drop) if the
    /// egress connection isn't currently able to keep up or is down.
    pub fn send(&self, framed: Vec<u8>, metrics: &PipelineMetrics) {
        if self.tx.try_send(framed).is_err() {
            metrics.record_dropped_packet();
        }
        metrics.maybe_log_drops(DROP_LOG_INTERVAL);
    }
}

async fn run(addr: String, mut rx: mpsc::Receiver<Vec<u8>>, metrics: PipelineMetrics) {
    loop {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(mut stream)) => {
                tracing::info!(%addr, "voice-input connected to speech-rec audio port");
                while let Some(frame) = rx.recv().await {
                    if let Err(err) = stream.write_all(&frame).await {
                        tracing::warn!(%addr, "speech-rec audio connection lost: {err}");
                        break;
                    }
                    metrics.packets_emitted.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(%addr, "speech-rec audio connect failed: {err}");
            }
            Err(_) => {
                tracing::warn!(%addr, "speech-rec audio connect timed out");
            }
        }
        tokio::time::sleep(RECONNECT_BACKOFF).await;
    }
}
