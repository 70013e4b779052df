use thiserror::Error;

/// Top-level error type threaded through the pipeline's long-lived loops.
///
/// Every long-lived task catches and logs one of these rather than unwinding;
/// only startup-time device/config failures are allowed to abort the process.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("transient error, will retry: {0}")]
    Transient(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Transport(TransportError::Io(err))
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Transient(format!("task join failed: {err}"))
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection refused or reset, will retry")]
    Disconnected,

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
}

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("declared frame length {declared} exceeds ceiling {ceiling}")]
    FrameTooLarge { declared: u32, ceiling: u32 },

    #[error("truncated or malformed payload: {0}")]
    Malformed(String),

    #[error("unknown status enum value: {0}")]
    UnknownStatus(i32),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("device disconnected")]
    DeviceDisconnected,

    #[error("format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("cpal build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("cpal play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("cpal stream error: {0}")]
    Stream(#[from] cpal::StreamError),

    #[error("wav decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("fatal audio error: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("environment variable error for {var}: {reason}")]
    EnvVar { var: String, reason: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("llm request failed: {0}")]
    Llm(String),

    #[error("tts stream closed unexpectedly: {0}")]
    TtsClosed(String),

    #[error("cloud engine http error: {0}")]
    Http(String),
}

/// How an error should be handled by the owning long-lived loop.
#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    /// Retry after a backoff.
    Retry { delay: std::time::Duration },
    /// Log and drop the offending unit of work (packet, line, frame).
    Discard,
    /// Cannot continue; process should exit non-zero.
    Fatal,
}

impl PipelineError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            PipelineError::Transport(_) => RecoveryStrategy::Retry {
                delay: std::time::Duration::from_secs(2),
            },
            PipelineError::Proto(_) => RecoveryStrategy::Discard,
            PipelineError::Config(_) | PipelineError::Fatal(_) => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Discard,
        }
    }
}
