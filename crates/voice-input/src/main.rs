//! Mic capture (or WAV mock) gated by a hangover VAD, emitting a framed
//! `VadPacket` stream to Speech-Rec's audio port.

mod egress;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vocalis_audio::{spawn_capture, CaptureConfig};
use vocalis_foundation::ConfigError;
use vocalis_proto::{frame_packet, VadPacket};
use vocalis_telemetry::PipelineMetrics;
use vocalis_vad::{EnergyThresholdClassifier, HangoverConfig, HangoverGate};

use egress::Egress;

fn init_logging() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "voice-input.log");
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
#[command(name = "voice-input", author, version, about = "Mic capture and VAD gate")]
struct Cli {
    /// Input device name; default device if unset.
    #[arg(long, env = "INPUT_DEVICE")]
    device: Option<String>,

    /// Path to a WAV file to loop instead of opening a real device.
    #[arg(long, env = "MOCK_WAV_PATH")]
    mock_wav_path: Option<PathBuf>,

    /// Hangover window in milliseconds; must be strictly positive.
    #[arg(long, env = "HANGOVER_MS", default_value_t = 500)]
    hangover_ms: i64,

    /// Energy-threshold floor in dBFS for the reference VAD classifier.
    #[arg(long, env = "VAD_FLOOR_DB", default_value_t = -40.0)]
    vad_floor_db: f32,

    /// Samples per capture frame fed to the gate.
    #[arg(long, env = "FRAME_SIZE_SAMPLES", default_value_t = 512)]
    frame_size_samples: usize,

    /// Speech-Rec host to connect the audio egress to.
    #[arg(long, env = "SPEECH_REC_HOST", default_value = "127.0.0.1")]
    speech_rec_host: String,

    /// Speech-Rec audio ingest port.
    #[arg(long, env = "SPEECH_REC_AUDIO_PORT", default_value_t = 5002)]
    speech_rec_audio_port: u16,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = init_logging()?;
    let cli = Cli::parse();

    let hangover = HangoverConfig::from_millis(cli.hangover_ms).map_err(|e: ConfigError| {
        tracing::error!("invalid HANGOVER_MS configuration: {e}");
        e
    })?;
    let classifier = EnergyThresholdClassifier::new(cli.vad_floor_db);
    let mut gate = HangoverGate::new(Box::new(classifier), hangover);

    let target_rate = 16_000;
    let capture_cfg = CaptureConfig {
        device_name: cli.device.clone(),
        mock_wav_path: cli.mock_wav_path.clone(),
        frame_size_samples: cli.frame_size_samples,
        target_rate,
    };
    let mut frames = spawn_capture(capture_cfg);

    let metrics = PipelineMetrics::new();
    let egress_addr = format!("{}:{}", cli.speech_rec_host, cli.speech_rec_audio_port);
    let egress = Egress::spawn(egress_addr, metrics.clone());

    let mut sequence: u64 = 0;
    tracing::info!("voice-input running, gating into speech-rec audio egress");

    while let Some(frame) = frames.recv().await {
        metrics.frames_captured.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let out = gate.process(&frame.samples, std::time::Instant::now());
        let timestamp_ms = now_ms();

        if let Some(status) = out.status {
            metrics.status_transitions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let packet = VadPacket::status(timestamp_ms, status);
            egress.send(frame_packet(&packet), &metrics);
        }

        if out.emit_audio {
            sequence += 1;
            let data: Vec<u8> = frame.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            let packet = VadPacket::audio(timestamp_ms, target_rate, 1, sequence, data);
            egress.send(frame_packet(&packet), &metrics);
        }
    }

    tracing::info!("capture channel closed, voice-input exiting");
    Ok(())
}
