use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::state::SpeechRecState;

pub async fn handle_connection(mut socket: TcpStream, state: Arc<SpeechRecState>) {
    let (tx, mut rx) = mpsc::channel::<String>(100);
    *state.text_sink.lock() = Some(tx);

    while let Some(line) = rx.recv().await {
        if let Err(err) = socket.write_all(format!("{line}\n").as_bytes()).await {
            tracing::warn!("speech-rec text client write failed: {err}");
            break;
        }
    }
}
