use crate::wire::{write_message, BusMessage};
use bytes::Bytes;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use vocalis_telemetry::BusMetrics;

/// The `bind` side of the bus: accepts any number of subscriber
/// connections and fans every published message out to all of them.
/// A slow subscriber that falls behind the broadcast channel's capacity
/// simply misses messages (`broadcast::error::RecvError::Lagged`) rather
/// than backpressuring the publisher — the same "drop, never queue
/// unbounded" policy used everywhere else in this pipeline.
#[derive(Clone)]
pub struct BusPublisher {
    tx: broadcast::Sender<BusMessage>,
    metrics: Arc<BusMetrics>,
}

impl BusPublisher {
    /// Binds `addr` and starts accepting subscriber connections in the
    /// background. `channel_capacity` bounds how far a subscriber may lag
    /// before messages are dropped for it.
    pub async fn bind(addr: &str, channel_capacity: usize) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (tx, _rx) = broadcast::channel(channel_capacity);
        let metrics = Arc::new(BusMetrics::new());

        let accept_tx = tx.clone();
        let accept_metrics = metrics.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, peer)) => {
                        tracing::info!(%peer, "bus subscriber connected");
                        accept_metrics
                            .subscribers_connected
                            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        let mut rx = accept_tx.subscribe();
                        let metrics = accept_metrics.clone();
                        tokio::spawn(async move {
                            let mut socket = socket;
                            loop {
                                match rx.recv().await {
                                    Ok(msg) => {
                                        if let Err(err) = write_message(&mut socket, &msg).await {
                                            tracing::warn!(%peer, "bus subscriber write failed: {err}");
                                            break;
                                        }
                                    }
                                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                        tracing::warn!(%peer, skipped, "bus subscriber lagged, dropping messages");
                                    }
                                    Err(broadcast::error::RecvError::Closed) => break,
                                }
                            }
                            metrics.on_publish_err();
                            tracing::info!(%peer, "bus subscriber disconnected");
                        });
                    }
                    Err(err) => {
                        tracing::error!("bus accept failed: {err}");
                    }
                }
            }
        });

        Ok(Self { tx, metrics })
    }

    pub fn publish(&self, topic: impl Into<String>, payload: impl Into<Bytes>) {
        let msg = BusMessage {
            topic: topic.into(),
            payload: payload.into(),
        };
        match self.tx.send(msg) {
            Ok(_) => self.metrics.on_publish_ok(),
            Err(_) => {
                // No subscribers currently connected; not an error condition.
                tracing::trace!("no bus subscribers connected, message dropped");
            }
        }
    }

    pub fn metrics(&self) -> Arc<BusMetrics> {
        self.metrics.clone()
    }
}
