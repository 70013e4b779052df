use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use vocalis_stt::SegmenterCommand;

use crate::state::SpeechRecState;

const CANCEL_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

pub async fn handle_connection(socket: TcpStream, state: Arc<SpeechRecState>) {
    let mut reader = BufReader::new(socket);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let cmd = line.trim();
                if !cmd.is_empty() {
                    apply_command(&state, cmd).await;
                }
            }
            Err(err) => {
                tracing::warn!("speech-rec control connection read error: {err}");
                break;
            }
        }
    }
}

async fn apply_command(state: &Arc<SpeechRecState>, raw: &str) {
    let command = match raw.to_ascii_uppercase().as_str() {
        "START" => SegmenterCommand::Start,
        "STOP" => SegmenterCommand::Stop,
        "RESET" => SegmenterCommand::Reset,
        other => {
            tracing::warn!(command = other, "unknown speech-rec control command");
            return;
        }
    };

    tracing::info!(?command, "speech-rec control command received");
    let effect = state.segmenter.lock().apply_command(command);

    if effect.reset_buffer {
        state.buffer.reset();
        state.queue.clear();
    }
    if effect.cancel_worker {
        state.worker.cancel_and_join(CANCEL_JOIN_TIMEOUT).await;
    }
    if matches!(command, SegmenterCommand::Reset) {
        state.metrics.resets_handled.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}
