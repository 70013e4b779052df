use crate::wire::{write_message, BusMessage};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use vocalis_telemetry::BusMetrics;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// The inverted pub/sub pairing some links in this pipeline use: here
/// the publisher is the `connect`ing side and a `BindingSubscriber`
/// owns the bind. Used by Orchestrator → Voice-Output, where
/// Voice-Output owns the long-lived bound endpoint.
pub struct ConnectingPublisher {
    tx: mpsc::Sender<BusMessage>,
    metrics: Arc<BusMetrics>,
}

impl ConnectingPublisher {
    pub fn connect(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let (tx, rx) = mpsc::channel(100);
        let metrics = Arc::new(BusMetrics::new());
        tokio::spawn(run(addr, rx, metrics.clone()));
        Self { tx, metrics }
    }

    /// Enqueues one message. Dropped (and counted) if the connection is
    /// down and the outgoing queue is already full, same "drop rather
    /// than queue unbounded" policy as the rest of the pipeline.
    pub fn publish(&self, topic: impl Into<String>, payload: impl Into<Bytes>) {
        let msg = BusMessage {
            topic: topic.into(),
            payload: payload.into(),
        };
        if self.tx.try_send(msg).is_err() {
            self.metrics.on_publish_err();
        } else {
            self.metrics.on_publish_ok();
        }
    }

    pub fn metrics(&self) -> Arc<BusMetrics> {
        self.metrics.clone()
    }
}

async fn run(addr: String, mut rx: mpsc::Receiver<BusMessage>, metrics: Arc<BusMetrics>) {
    loop {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(mut stream)) => {
                tracing::info!(%addr, "bus publisher connected to subscriber");
                while let Some(msg) = rx.recv().await {
                    if let Err(err) = write_message(&mut stream, &msg).await {
                        tracing::warn!(%addr, "bus publish connection lost: {err}");
                        break;
                    }
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(%addr, "bus publish connect failed: {err}");
            }
            Err(_) => {
                tracing::warn!(%addr, "bus publish connect timed out");
            }
        }
        tokio::time::sleep(RECONNECT_BACKOFF).await;
    }
}
