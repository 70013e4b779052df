//! Subscribes to the Orchestrator's audio/control bus topics and plays
//! PCM through a local output device (or a WAV-dump mock sink).

use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vocalis_audio::{spawn_output, OutputConfig, Reformatter, SampleWidth};
use vocalis_bus::BindingSubscriber;

const TOPIC_AUDIO: &str = "voice_output_audio";
const TOPIC_CONTROL: &str = "voice_output_control";

fn init_logging() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "voice-output.log");
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
#[command(name = "voice-output", author, version, about = "Bus-driven PCM playback")]
struct Cli {
    #[arg(long, env = "ZMQ_PUB_URL", default_value = "0.0.0.0:5557")]
    bind_addr: String,

    #[arg(long, env = "PLAYBACK_DEVICE")]
    playback_device: Option<String>,
    #[arg(long, env = "MOCK_WAV_DUMP_PATH")]
    mock_wav_dump_path: Option<std::path::PathBuf>,

    #[arg(long, env = "SAMPLE_RATE", default_value_t = 48_000)]
    sample_rate: u32,
    #[arg(long, env = "CHANNELS", default_value_t = 2)]
    channels: u16,
    /// Channel count of the incoming PCM, converted to `channels` if it differs.
    #[arg(long, env = "INPUT_CHANNELS")]
    input_channels: Option<u16>,
}

#[derive(Deserialize)]
struct ControlMessage {
    #[serde(rename = "type")]
    kind: String,
    command: Option<String>,
    text: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = init_logging()?;
    let cli = Cli::parse();

    tracing::info!(
        addr = %cli.bind_addr,
        sample_rate = cli.sample_rate,
        channels = cli.channels,
        "starting voice-output service"
    );

    let sink = spawn_output(OutputConfig {
        device_name: cli.playback_device.clone(),
        mock_wav_path: cli.mock_wav_dump_path.clone(),
        sample_rate: cli.sample_rate,
        channels: cli.channels,
    });

    let input_channels = cli.input_channels.unwrap_or(cli.channels);
    let reformatter = Arc::new(Mutex::new(Reformatter::new(
        cli.sample_rate,
        cli.channels,
        SampleWidth::S32,
    )));

    let mut subscriber = BindingSubscriber::bind(
        &cli.bind_addr,
        vec![TOPIC_AUDIO.to_string(), TOPIC_CONTROL.to_string()],
    )
    .await?;

    while let Some(msg) = subscriber.recv().await {
        match msg.topic.as_str() {
            TOPIC_AUDIO => {
                let pcm = if input_channels == cli.channels {
                    msg.payload.to_vec()
                } else {
                    reformatter
                        .lock()
                        .process(&msg.payload, cli.sample_rate, input_channels, SampleWidth::S32)
                };
                sink.write(pcm);
            }
            TOPIC_CONTROL => handle_control(&msg.payload),
            other => tracing::debug!(topic = other, "ignoring message on unknown topic"),
        }
    }

    Ok(())
}

fn parse_control_message(payload: &[u8]) -> Option<ControlMessage> {
    let text = std::str::from_utf8(payload).ok()?;
    match serde_json::from_str(text) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::error!(%text, "failed to decode control message: {err}");
            None
        }
    }
}

fn handle_control(payload: &[u8]) {
    let Some(parsed) = parse_control_message(payload) else {
        return;
    };

    match parsed.kind.as_str() {
        "control" => match parsed.command.as_deref() {
            Some("stop") => tracing::info!("received stop command (no-op, playback is push-driven)"),
            Some("pause") => tracing::info!("received pause command (no-op, playback is push-driven)"),
            Some(other) => tracing::warn!(command = other, "unrecognized control command"),
            None => tracing::warn!("control message missing command field"),
        },
        "speak" => {
            tracing::info!(text = parsed.text.as_deref().unwrap_or(""), "orchestrator starting speech turn");
        }
        other => tracing::debug!(kind = other, "unrecognized control message type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stop_control_message() {
        let payload = br#"{"type":"control","command":"stop"}"#;
        let parsed = parse_control_message(payload).unwrap();
        assert_eq!(parsed.kind, "control");
        assert_eq!(parsed.command.as_deref(), Some("stop"));
    }

    #[test]
    fn parses_speak_message_with_text() {
        let payload = br#"{"type":"speak","text":"hello there"}"#;
        let parsed = parse_control_message(payload).unwrap();
        assert_eq!(parsed.kind, "speak");
        assert_eq!(parsed.text.as_deref(), Some("hello there"));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(parse_control_message(&[0xff, 0xfe, 0xfd]).is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_control_message(b"not json").is_none());
    }

    #[test]
    fn handle_control_does_not_panic_on_unknown_command() {
        handle_control(br#"{"type":"control","command":"rewind"}"#);
        handle_control(br#"{"type":"unknown"}"#);
    }
}
