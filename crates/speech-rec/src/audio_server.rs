use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use vocalis_proto::{Framer, Payload, VadStatus};

use crate::state::SpeechRecState;

pub async fn handle_connection(mut socket: TcpStream, state: Arc<SpeechRecState>) {
    let mut framer = Framer::default();
    let mut buf = [0u8; 4096];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => match framer.decode(&buf[..n]) {
                Ok(packets) => {
                    for packet in packets {
                        state.queue.push(packet, &state.metrics);
                    }
                }
                Err(err) => {
                    tracing::error!("speech-rec audio framing desync, dropping connection: {err}");
                    break;
                }
            },
            Err(err) => {
                tracing::warn!("speech-rec audio connection read error: {err}");
                break;
            }
        }
    }
    framer.reset();
}

/// Runs forever, draining the packet queue: folds status packets into
/// the segmenter and audio packets into the utterance buffer, then spawns
/// a transcription whenever a drained utterance is ready and no worker
/// is already running.
pub async fn run_processing_loop(state: Arc<SpeechRecState>) {
    loop {
        let packet = state.queue.pop().await;
        match packet.payload {
            Payload::Status(status) => {
                state.segmenter.lock().on_status(status);
                state.metrics.status_transitions.fetch_add(1, Ordering::Relaxed);
                if matches!(status, VadStatus::Unknown) {
                    tracing::trace!("ignoring UNKNOWN status packet");
                }
            }
            Payload::Audio(audio) => {
                if audio.channels != 1 || audio.sample_rate != 16_000 {
                    state.warn_format_mismatch_once(audio.channels, audio.sample_rate);
                } else {
                    let samples: Vec<i16> = audio
                        .data
                        .chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]]))
                        .collect();
                    state.buffer.append_i16(&samples);
                }
            }
        }
        maybe_spawn_transcription(&state);
    }
}

fn maybe_spawn_transcription(state: &Arc<SpeechRecState>) {
    let should_spawn = {
        let mut segmenter = state.segmenter.lock();
        segmenter.take_pending_if_idle(state.worker.is_busy())
    };
    if !should_spawn {
        return;
    }

    let samples = state.buffer.drain();
    state.metrics.utterances_segmented.fetch_add(1, Ordering::Relaxed);
    state.metrics.transcriptions_started.fetch_add(1, Ordering::Relaxed);

    let engine = state.engine.clone();
    let result_state = state.clone();
    state.worker.spawn(engine, samples, move |text| {
        result_state.metrics.transcriptions_completed.fetch_add(1, Ordering::Relaxed);
        result_state.emit_text(text, true);
    });
}
