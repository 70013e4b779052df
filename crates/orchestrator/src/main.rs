//! Turn-taking orchestrator: reads final transcripts from Speech-Rec,
//! hands them to an LLM/TTS engine, and publishes control + audio to
//! Voice-Output, all driven by the button bus for session resets.

mod engine;
mod engines;
mod sr_client;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vocalis_audio::{Reformatter, SampleWidth};
use vocalis_bus::{BusSubscriber, ConnectingPublisher};
use vocalis_foundation::SessionLog;
use vocalis_telemetry::PipelineMetrics;

use engine::{AudioChunk, Engine};
use engines::{CloudEngine, LocalEngine};
use sr_client::SrClient;
use state::{FsmState, OrchestratorState};

const AUDIO_TOPIC: &str = "voice_output_audio";
const CONTROL_TOPIC: &str = "voice_output_control";

fn init_logging() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "orchestrator.log");
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
#[command(name = "orchestrator", author, version, about = "Turn-taking LLM/TTS orchestrator")]
struct Cli {
    #[arg(long, env = "SPEECH_REC_HOST", default_value = "127.0.0.1")]
    speech_rec_host: String,
    #[arg(long, env = "SPEECH_REC_CONTROL_PORT", default_value_t = 5001)]
    speech_rec_control_port: u16,
    #[arg(long, env = "SPEECH_REC_TEXT_PORT", default_value_t = 5003)]
    speech_rec_text_port: u16,

    #[arg(long, env = "BUTTONS_HOST", default_value = "127.0.0.1")]
    buttons_host: String,
    #[arg(long, env = "BUTTONS_PORT", default_value_t = 5558)]
    buttons_port: u16,

    #[arg(long, env = "VOICE_OUTPUT_HOST", default_value = "127.0.0.1")]
    voice_output_host: String,
    #[arg(long, env = "VOICE_OUTPUT_PORT", default_value_t = 5557)]
    voice_output_port: u16,

    #[arg(long, env = "SESSION_TIMEOUT_SECONDS", default_value_t = 5.0)]
    session_timeout_seconds: f64,
    #[arg(long, env = "ENABLE_SESSION_LOGGING", default_value_t = false)]
    enable_session_logging: bool,
    #[arg(long, env = "SESSION_LOG_PATH", default_value = "logs/sessions.jsonl")]
    session_log_path: String,

    /// "local" (on-prem LLM + streaming TTS) or "cloud" (hosted voice API).
    #[arg(long, env = "ENGINE_KIND", default_value = "local")]
    engine_kind: String,

    #[arg(long, env = "LLM_API_URL", default_value = "http://localhost:11434/v1/chat/completions")]
    llm_api_url: String,
    #[arg(
        long,
        env = "SYSTEM_PROMPT",
        default_value = "You are Alice, a helpful AI assistant for the AlicePi smart speaker. Keep your responses concise and friendly."
    )]
    system_prompt: String,

    #[arg(long, env = "VIBEVOICE_WS_URL", default_value = "ws://localhost:8000/stream")]
    vibevoice_ws_url: String,
    #[arg(long, env = "VIBEVOICE_VOICE")]
    vibevoice_voice: Option<String>,
    #[arg(long, env = "VIBEVOICE_CFG_SCALE")]
    vibevoice_cfg_scale: Option<f32>,
    #[arg(long, env = "VIBEVOICE_INFERENCE_STEPS")]
    vibevoice_inference_steps: Option<u32>,

    #[arg(long, env = "CLOUD_API_URL", default_value = "")]
    cloud_api_url: String,
    #[arg(long, env = "CLOUD_VOICE_ID", default_value = "")]
    cloud_voice_id: String,
    #[arg(long, env = "CLOUD_TENANT_ID")]
    cloud_tenant_id: Option<String>,
}

#[derive(Deserialize)]
struct SrTextLine {
    #[serde(default)]
    text: String,
    #[serde(default)]
    is_final: bool,
}

#[derive(Deserialize)]
struct ButtonEvent {
    event: Option<String>,
}

enum SrEvent {
    Connected,
    Text(String),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = init_logging()?;
    let cli = Cli::parse();

    let state = Arc::new(OrchestratorState::new(
        SessionLog::new(cli.session_log_path.clone(), cli.enable_session_logging),
        Duration::from_secs_f64(cli.session_timeout_seconds),
    ));
    let metrics = PipelineMetrics::new();

    let engine: Arc<dyn Engine> = match cli.engine_kind.as_str() {
        "cloud" => Arc::new(CloudEngine::new(
            cli.cloud_api_url.clone(),
            cli.cloud_voice_id.clone(),
            cli.cloud_tenant_id.clone(),
        )),
        _ => Arc::new(LocalEngine::new(
            cli.llm_api_url.clone(),
            cli.system_prompt.clone(),
            cli.vibevoice_ws_url.clone(),
            cli.vibevoice_voice.clone(),
            cli.vibevoice_cfg_scale,
            cli.vibevoice_inference_steps,
        )),
    };

    let voice_output_addr = format!("{}:{}", cli.voice_output_host, cli.voice_output_port);
    let publisher = Arc::new(ConnectingPublisher::connect(voice_output_addr));
    let reformatter = Arc::new(Mutex::new(Reformatter::new(48_000, 2, SampleWidth::S32)));

    let (sr_tx, mut sr_rx) = tokio::sync::mpsc::channel::<SrEvent>(100);
    let connect_tx = sr_tx.clone();
    let text_tx = sr_tx.clone();
    let sr_client = Arc::new(SrClient::start(
        cli.speech_rec_host.clone(),
        cli.speech_rec_control_port,
        cli.speech_rec_text_port,
        move || {
            let _ = connect_tx.try_send(SrEvent::Connected);
        },
        move |line| {
            let _ = text_tx.try_send(SrEvent::Text(line));
        },
    ));

    let sr_task = tokio::spawn({
        let state = state.clone();
        let engine = engine.clone();
        let publisher = publisher.clone();
        let reformatter = reformatter.clone();
        let sr_client = sr_client.clone();
        let metrics = metrics.clone();
        async move {
            while let Some(event) = sr_rx.recv().await {
                match event {
                    SrEvent::Connected => {
                        sr_client.send_command("START").await;
                        state.set_fsm(FsmState::Listening);
                    }
                    SrEvent::Text(line) => {
                        handle_sr_text(
                            &line,
                            &state,
                            &engine,
                            &publisher,
                            &reformatter,
                            &metrics,
                        )
                        .await;
                    }
                }
            }
        }
    });

    let buttons_addr = format!("{}:{}", cli.buttons_host, cli.buttons_port);
    let buttons_task = tokio::spawn({
        let state = state.clone();
        let publisher = publisher.clone();
        let sr_client = sr_client.clone();
        let metrics = metrics.clone();
        async move {
            let mut subscriber = BusSubscriber::connect(buttons_addr, "");
            while let Some(msg) = subscriber.recv().await {
                let Ok(text) = std::str::from_utf8(&msg.payload) else {
                    continue;
                };
                tracing::info!(event = %text, "received button event");
                let Ok(payload) = serde_json::from_str::<ButtonEvent>(text) else {
                    tracing::error!(%text, "failed to decode button event");
                    continue;
                };
                if let Some(event) = payload.event {
                    handle_button_event(&event, &state, &publisher, &sr_client, &metrics).await;
                }
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown_tx = Mutex::new(Some(shutdown_tx));
    ctrlc::set_handler(move || {
        if let Some(tx) = shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
    })?;

    tracing::info!(state = state.fsm().name(), "orchestrator service started");
    let _ = shutdown_rx.await;

    tracing::info!("orchestrator stopping...");
    state.log_final();
    sr_task.abort();
    buttons_task.abort();
    Ok(())
}

async fn handle_sr_text(
    line: &str,
    state: &Arc<OrchestratorState>,
    engine: &Arc<dyn Engine>,
    publisher: &Arc<ConnectingPublisher>,
    reformatter: &Arc<Mutex<Reformatter>>,
    metrics: &PipelineMetrics,
) {
    let payload: SrTextLine = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(_) => {
            tracing::error!(%line, "failed to decode JSON from SR");
            return;
        }
    };

    if payload.text.is_empty() {
        return;
    }
    tracing::info!(text = %payload.text, is_final = payload.is_final, "hearing");

    if !payload.is_final {
        return;
    }

    state.check_timeout_and_maybe_clear();
    state.set_fsm(FsmState::Processing);
    process_text(&payload.text, state, engine, publisher, reformatter, metrics).await;
}

async fn process_text(
    text: &str,
    state: &Arc<OrchestratorState>,
    engine: &Arc<dyn Engine>,
    publisher: &Arc<ConnectingPublisher>,
    reformatter: &Arc<Mutex<Reformatter>>,
    metrics: &PipelineMetrics,
) {
    state.add_user_turn(text);
    state.update_tts_end();

    let history = state.history_snapshot();
    state.set_fsm(FsmState::Speaking);
    reformatter.lock().reset();

    let mut on_audio_chunk = |chunk: AudioChunk<'_>| {
        let width = if chunk.bits_per_sample > 16 {
            SampleWidth::S32
        } else {
            SampleWidth::S16
        };
        let converted = reformatter.lock().process(chunk.data, chunk.sample_rate, chunk.channels, width);
        publisher.publish(AUDIO_TOPIC, converted);
    };

    let response = engine.process(text, &history, &mut on_audio_chunk).await;

    match response {
        Ok(result) => {
            metrics.turns_processed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if !result.text.is_empty() {
                state.add_assistant_turn(result.text.clone());

                let voice_text = result
                    .voice_text
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| result.text.trim().to_string());

                tracing::info!(len = result.text.len(), "processing complete");
                if !voice_text.is_empty() {
                    let ctrl = json!({"type": "speak", "text": voice_text});
                    publisher.publish(CONTROL_TOPIC, ctrl.to_string());
                }
            }
        }
        Err(err) => {
            metrics.engine_errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            tracing::error!("engine processing failed: {err}");
        }
    }

    state.update_tts_end();
    state.set_fsm(FsmState::Listening);
}

async fn handle_button_event(
    event: &str,
    state: &Arc<OrchestratorState>,
    publisher: &Arc<ConnectingPublisher>,
    sr_client: &Arc<SrClient>,
    metrics: &PipelineMetrics,
) {
    tracing::info!(event, "handling button event");
    match event {
        "RESET" => {
            tracing::info!("resetting session...");
            state.reset_session();

            let stop_msg = json!({"type": "control", "command": "stop"});
            publisher.publish(CONTROL_TOPIC, stop_msg.to_string());

            sr_client.send_command("RESET").await;
            state.set_fsm(FsmState::Listening);
            metrics.resets_handled.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        "LONG_RESET" => {
            tracing::warn!("factory reset requested (mock, no-op)");
        }
        other if other.contains("VOLUME") => {
            tracing::info!(event = other, "volume change requested (mock, no-op)");
        }
        other => {
            tracing::debug!(event = other, "unhandled button event");
        }
    }
}
