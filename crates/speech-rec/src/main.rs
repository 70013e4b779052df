//! VadPacket ingress, status-driven utterance segmentation, and
//! cancellable transcription, exposed over three single-client TCP ports.

mod audio_server;
mod control;
mod single_client;
mod state;
mod text_server;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vocalis_stt::MockAsrEngine;

use single_client::bind_single_client;
use state::SpeechRecState;

fn init_logging() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "speech-rec.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking_file).with_ansi(false))
        .init();
    Ok(guard)
}

#[derive(Parser, Debug)]
#[command(name = "speech-rec", author, version, about = "VadPacket ingest and transcription")]
struct Cli {
    #[arg(long, env = "SPEECH_REC_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "SPEECH_REC_CONTROL_PORT", default_value_t = 5001)]
    control_port: u16,

    #[arg(long, env = "SPEECH_REC_AUDIO_PORT", default_value_t = 5002)]
    audio_port: u16,

    #[arg(long, env = "SPEECH_REC_TEXT_PORT", default_value_t = 5003)]
    text_port: u16,

    /// Fixed text the shipped mock ASR engine returns for every utterance.
    #[arg(long, env = "MOCK_ASR_TEXT", default_value = "mock transcription")]
    mock_asr_text: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = init_logging()?;
    let cli = Cli::parse();

    let engine = Arc::new(MockAsrEngine::new(cli.mock_asr_text.clone()));
    let state = SpeechRecState::new(engine);

    tokio::spawn(audio_server::run_processing_loop(state.clone()));

    let control_addr = format!("{}:{}", cli.host, cli.control_port);
    let audio_addr = format!("{}:{}", cli.host, cli.audio_port);
    let text_addr = format!("{}:{}", cli.host, cli.text_port);

    let control_state = state.clone();
    let control_task = tokio::spawn(async move {
        bind_single_client(&control_addr, |socket| {
            control::handle_connection(socket, control_state.clone())
        })
        .await
    });

    let audio_state = state.clone();
    let audio_task = tokio::spawn(async move {
        bind_single_client(&audio_addr, |socket| {
            audio_server::handle_connection(socket, audio_state.clone())
        })
        .await
    });

    let text_state = state.clone();
    let text_task = tokio::spawn(async move {
        bind_single_client(&text_addr, |socket| {
            text_server::handle_connection(socket, text_state.clone())
        })
        .await
    });

    tracing::info!("speech-rec listening on control/audio/text ports");

    let (control_res, audio_res, text_res) = tokio::join!(control_task, audio_task, text_task);
    control_res??;
    audio_res??;
    text_res??;
    Ok(())
}
