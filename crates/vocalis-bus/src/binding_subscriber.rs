use crate::wire::{read_message, BusMessage, DEFAULT_MAX_PART_LEN};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// The inverted pub/sub pairing's subscriber half: binds and accepts
/// connections from a `ConnectingPublisher`, forwarding any message
/// whose topic matches one of `topic_prefixes`.
pub struct BindingSubscriber {
    rx: mpsc::Receiver<BusMessage>,
}

impl BindingSubscriber {
    pub async fn bind(addr: &str, topic_prefixes: Vec<String>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, peer)) => {
                        tracing::info!(%peer, "bus publisher connected");
                        let tx = tx.clone();
                        let prefixes = topic_prefixes.clone();
                        tokio::spawn(async move {
                            let mut socket = socket;
                            loop {
                                match read_message(&mut socket, DEFAULT_MAX_PART_LEN).await {
                                    Ok(msg) => {
                                        let matches = prefixes.iter().any(|p| msg.topic.starts_with(p));
                                        if matches && tx.send(msg).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(err) => {
                                        tracing::warn!(%peer, "bus publisher connection lost: {err}");
                                        break;
                                    }
                                }
                            }
                        });
                    }
                    Err(err) => {
                        tracing::error!("bus accept failed: {err}");
                    }
                }
            }
        });

        Ok(Self { rx })
    }

    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}
