//! Persistent client connections to Speech-Rec's control and text ports,
//! each maintained by its own reconnect loop, matching `SRClient` in the
//! reference implementation.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct SrClient {
    control_conn: Arc<Mutex<Option<TcpStream>>>,
}

impl SrClient {
    /// Spawns the control and text maintenance loops. `on_connect` fires
    /// every time the control socket (re)connects; `on_text` fires once
    /// per non-empty line read from the text socket.
    pub fn start(
        host: String,
        control_port: u16,
        text_port: u16,
        on_connect: impl Fn() + Send + Sync + 'static,
        on_text: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        let control_conn = Arc::new(Mutex::new(None));

        let control_addr = format!("{host}:{control_port}");
        tokio::spawn(maintain_control_connection(
            control_addr,
            control_conn.clone(),
            on_connect,
        ));

        let text_addr = format!("{host}:{text_port}");
        tokio::spawn(maintain_text_connection(text_addr, on_text));

        Self { control_conn }
    }

    pub async fn send_command(&self, cmd: &str) {
        let mut guard = self.control_conn.lock().await;
        match guard.as_mut() {
            Some(stream) => match stream.write_all(cmd.as_bytes()).await {
                Ok(()) => tracing::info!(cmd, "sent SR control command"),
                Err(err) => {
                    tracing::error!("failed to send SR command {cmd}: {err}");
                    *guard = None;
                }
            },
            None => tracing::warn!(cmd, "SR control socket not connected, dropping command"),
        }
    }
}

async fn maintain_control_connection(
    addr: String,
    conn: Arc<Mutex<Option<TcpStream>>>,
    on_connect: impl Fn() + Send + Sync + 'static,
) {
    loop {
        let already_connected = conn.lock().await.is_some();
        if !already_connected {
            match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
                Ok(Ok(stream)) => {
                    tracing::info!(%addr, "connected to SR control");
                    *conn.lock().await = Some(stream);
                    on_connect();
                }
                Ok(Err(err)) => {
                    tracing::debug!("SR control connection pending: {err}");
                    tokio::time::sleep(RECONNECT_BACKOFF).await;
                    continue;
                }
                Err(_) => {
                    tokio::time::sleep(RECONNECT_BACKOFF).await;
                    continue;
                }
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn maintain_text_connection(addr: String, on_text: impl Fn(String) + Send + Sync + 'static) {
    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                tracing::info!(%addr, "connected to SR text output");
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) => {
                            tracing::warn!("SR text socket closed remotely");
                            break;
                        }
                        Ok(_) => {
                            let trimmed = line.trim();
                            if !trimmed.is_empty() {
                                on_text(trimmed.to_string());
                            }
                        }
                        Err(err) => {
                            tracing::error!("error reading SR text: {err}");
                            break;
                        }
                    }
                }
            }
            Err(_) => {
                tracing::debug!(%addr, "SR text connection pending...");
            }
        }
        tokio::time::sleep(RECONNECT_BACKOFF).await;
    }
}
