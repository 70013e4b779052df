use crate::wire::{read_message, BusMessage, DEFAULT_MAX_PART_LEN};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// The `connect` side of the bus. Runs a background task that dials
/// `addr`, reconnecting with a fixed backoff on disconnect, and forwards
/// every `BusMessage` whose topic matches `topic_prefix` over an mpsc
/// channel. An empty prefix subscribes to everything, mirroring a
/// PUB/SUB subscriber that filters on the empty string.
pub struct BusSubscriber {
    rx: mpsc::Receiver<BusMessage>,
}

impl BusSubscriber {
    pub fn connect(addr: impl Into<String>, topic_prefix: impl Into<String>) -> Self {
        let addr = addr.into();
        let topic_prefix = topic_prefix.into();
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            loop {
                match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
                    Ok(Ok(mut stream)) => {
                        tracing::info!(%addr, "bus subscriber connected to publisher");
                        loop {
                            match read_message(&mut stream, DEFAULT_MAX_PART_LEN).await {
                                Ok(msg) => {
                                    if msg.topic.starts_with(&topic_prefix) && tx.send(msg).await.is_err() {
                                        // Receiver dropped; subscriber is no longer wanted.
                                        return;
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(%addr, "bus connection lost: {err}");
                                    break;
                                }
                            }
                        }
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(%addr, "bus connect failed: {err}");
                    }
                    Err(_) => {
                        tracing::warn!(%addr, "bus connect timed out");
                    }
                }
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        });

        Self { rx }
    }

    /// Receives the next matching message, or `None` once the
    /// background task has permanently given up (receiver dropped).
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}
