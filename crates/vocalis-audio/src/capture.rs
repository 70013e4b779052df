use crate::device::DeviceManager;
use crate::reformatter::{Reformatter, SampleWidth};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use vocalis_foundation::AudioError;

/// One 16 kHz mono 16-bit chunk handed to the VAD gate.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub timestamp: Instant,
}

pub struct CaptureConfig {
    pub device_name: Option<String>,
    pub mock_wav_path: Option<PathBuf>,
    pub frame_size_samples: usize,
    pub target_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            mock_wav_path: None,
            frame_size_samples: 512,
            target_rate: 16_000,
        }
    }
}

/// Starts capturing audio in the background (live device or WAV mock
/// per `cfg.mock_wav_path`), normalized to mono/16-bit/`cfg.target_rate`,
/// and returns a channel yielding frames as they arrive.
pub fn spawn_capture(cfg: CaptureConfig) -> mpsc::Receiver<AudioFrame> {
    let (tx, rx) = mpsc::channel(100);
    if let Some(path) = cfg.mock_wav_path.clone() {
        tokio::spawn(async move { run_wav_mock(path, cfg, tx).await });
    } else {
        std::thread::spawn(move || run_live_capture(cfg, tx));
    }
    rx
}

async fn run_wav_mock(path: PathBuf, cfg: CaptureConfig, tx: mpsc::Sender<AudioFrame>) {
    loop {
        let mut reader = match hound::WavReader::open(&path) {
            Ok(r) => r,
            Err(err) => {
                tracing::error!("failed to open mock WAV {}: {err}", path.display());
                return;
            }
        };
        let spec = reader.spec();
        let samples: Vec<i32> = match reader.samples::<i32>().collect() {
            Ok(s) => s,
            Err(err) => {
                tracing::error!("failed to read mock WAV {}: {err}", path.display());
                return;
            }
        };
        let width = if spec.bits_per_sample > 16 {
            SampleWidth::S32
        } else {
            SampleWidth::S16
        };
        let bytes: Vec<u8> = match width {
            SampleWidth::S16 => samples.iter().flat_map(|&s| (s as i16).to_le_bytes()).collect(),
            SampleWidth::S32 => samples.iter().flat_map(|&s| s.to_le_bytes()).collect(),
        };

        let mut reformatter = Reformatter::new(cfg.target_rate, 1, SampleWidth::S16);
        let bytes_per_frame = cfg.frame_size_samples * spec.channels as usize * (width_bytes(width));
        let frame_duration =
            Duration::from_secs_f64(cfg.frame_size_samples as f64 / cfg.target_rate as f64);

        for chunk in bytes.chunks(bytes_per_frame.max(1)) {
            let out = reformatter.process(chunk, spec.sample_rate, spec.channels, width);
            let samples: Vec<i16> = out
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            if tx
                .send(AudioFrame {
                    samples,
                    timestamp: Instant::now(),
                })
                .await
                .is_err()
            {
                return;
            }
            tokio::time::sleep(frame_duration).await;
        }

        tracing::info!("mock WAV {} reached EOF, looping", path.display());
    }
}

fn width_bytes(width: SampleWidth) -> usize {
    match width {
        SampleWidth::S16 => 2,
        SampleWidth::S32 => 4,
    }
}

fn run_live_capture(cfg: CaptureConfig, tx: mpsc::Sender<AudioFrame>) {
    if let Err(err) = try_run_live_capture(cfg, tx) {
        tracing::error!("audio capture failed: {err}");
    }
}

fn try_run_live_capture(cfg: CaptureConfig, tx: mpsc::Sender<AudioFrame>) -> Result<(), AudioError> {
    let manager = DeviceManager::new();
    let device = manager.open_input(cfg.device_name.as_deref())?;
    let default_config = device
        .default_input_config()
        .map_err(|_| AudioError::FormatNotSupported {
            format: "no default input config".to_string(),
        })?;
    let sample_format = default_config.sample_format();
    let stream_config: StreamConfig = default_config.into();
    let src_rate = stream_config.sample_rate.0;
    let src_channels = stream_config.channels;

    let mut reformatter = Reformatter::new(cfg.target_rate, 1, SampleWidth::S16);
    let err_fn = |err: cpal::StreamError| tracing::error!("input stream error: {err}");

    let stream = match sample_format {
        SampleFormat::I16 => {
            let tx = tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let bytes: Vec<u8> = data.iter().flat_map(|&s| s.to_le_bytes()).collect();
                    emit_frame(&mut reformatter, &bytes, src_rate, src_channels, SampleWidth::S16, &tx);
                },
                err_fn,
                None,
            )
        }
        SampleFormat::F32 => {
            let tx = tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let bytes: Vec<u8> = data
                        .iter()
                        .flat_map(|&s| {
                            let clamped = s.clamp(-1.0, 1.0);
                            ((clamped * i16::MAX as f32).round() as i16).to_le_bytes()
                        })
                        .collect();
                    emit_frame(&mut reformatter, &bytes, src_rate, src_channels, SampleWidth::S16, &tx);
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{other:?}"),
            })
        }
    }
    .map_err(AudioError::from)?;

    stream.play().map_err(AudioError::from)?;
    tracing::info!("audio capture stream started at {src_rate}Hz/{src_channels}ch");

    // cpal streams run on the callback thread; keep this thread parked
    // alive for as long as the stream should run.
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn emit_frame(
    reformatter: &mut Reformatter,
    bytes: &[u8],
    src_rate: u32,
    src_channels: u16,
    src_width: SampleWidth,
    tx: &mpsc::Sender<AudioFrame>,
) {
    let out = reformatter.process(bytes, src_rate, src_channels, src_width);
    let samples: Vec<i16> = out
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    if tx.try_send(AudioFrame {
        samples,
        timestamp: Instant::now(),
    })
    .is_err()
    {
        tracing::trace!("capture channel full or closed, dropping frame");
    }
}
