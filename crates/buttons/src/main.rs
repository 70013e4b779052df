//! Publishes button-press events onto the shared pub/sub bus.
//!
//! No GPIO crate is wired into this workspace's dependency stack, so this
//! service always runs the way the original falls back to on a non-Pi
//! host: mock mode, accepting events from a stdin command loop instead of
//! real hardware lines.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vocalis_bus::BusPublisher;

const HOLD_DURATION: Duration = Duration::from_secs(2);
const EVENT_TOPIC: &str = "button_event";

fn init_logging() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "buttons.log");
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
#[command(name = "buttons", author, version, about = "Button event publisher")]
struct Cli {
    /// Host/interface to bind the pub/sub endpoint on.
    #[arg(long, env = "BUTTONS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind the pub/sub endpoint on.
    #[arg(long, env = "BUTTONS_PORT", default_value_t = 5558)]
    port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EventKind {
    Reset,
    VolumeUp,
    VolumeDown,
}

impl EventKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "RESET" => Some(EventKind::Reset),
            "VOLUME_UP" => Some(EventKind::VolumeUp),
            "VOLUME_DOWN" => Some(EventKind::VolumeDown),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            EventKind::Reset => "RESET",
            EventKind::VolumeUp => "VOLUME_UP",
            EventKind::VolumeDown => "VOLUME_DOWN",
        }
    }
}

#[derive(Debug)]
enum Command {
    Press(EventKind),
    Release(EventKind),
}

#[derive(Serialize)]
struct ButtonEvent {
    event: String,
    timestamp: String,
}

fn publish_event(publisher: &BusPublisher, event_name: &str) {
    let payload = ButtonEvent {
        event: event_name.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_vec(&payload).expect("button event always serializes");
    tracing::info!(event = event_name, "publishing button event");
    publisher.publish(EVENT_TOPIC, json);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = init_logging()?;
    let cli = Cli::parse();

    let addr = format!("{}:{}", cli.host, cli.port);
    let publisher = BusPublisher::bind(&addr, 64).await?;
    tracing::info!(%addr, "buttons service bound, running in mock mode");

    let (tx, mut rx) = mpsc::channel::<Command>(32);
    std::thread::spawn(move || stdin_loop(tx));

    let mut pending_holds: HashMap<EventKind, JoinHandle<()>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Press(kind) => {
                publish_event(&publisher, kind.name());
                if let Some(handle) = pending_holds.remove(&kind) {
                    handle.abort();
                }
                let long_name = format!("LONG_{}", kind.name());
                let publisher_for_hold = publisher.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(HOLD_DURATION).await;
                    publish_event(&publisher_for_hold, &long_name);
                });
                pending_holds.insert(kind, handle);
            }
            Command::Release(kind) => {
                if let Some(handle) = pending_holds.remove(&kind) {
                    handle.abort();
                }
            }
        }
    }

    Ok(())
}

/// Reads `press RESET` / `release RESET` commands from stdin (one per
/// line, case-insensitive event names) and forwards them to the async
/// side. Runs on a blocking thread since stdin has no async API here.
fn stdin_loop(tx: mpsc::Sender<Command>) {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                let mut parts = trimmed.splitn(2, char::is_whitespace);
                let verb = parts.next().unwrap_or_default();
                let event = parts.next().unwrap_or_default().trim();
                let parsed = EventKind::parse(event);
                let command = match (verb.to_ascii_lowercase().as_str(), parsed) {
                    ("press", Some(kind)) => Some(Command::Press(kind)),
                    ("release", Some(kind)) => Some(Command::Release(kind)),
                    _ => {
                        if !trimmed.is_empty() {
                            tracing::warn!(line = trimmed, "unrecognized button command");
                        }
                        None
                    }
                };
                if let Some(command) = command {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
            }
            Err(err) => {
                tracing::error!("stdin read failed: {err}");
                break;
            }
        }
    }
}
