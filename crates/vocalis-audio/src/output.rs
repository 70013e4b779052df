use crate::device::DeviceManager;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;
use vocalis_foundation::AudioError;

pub struct OutputConfig {
    pub device_name: Option<String>,
    pub mock_wav_path: Option<PathBuf>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            mock_wav_path: None,
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// A handle accepting raw interleaved S32_LE PCM chunks at the
/// configured device format; each chunk is fed to the real output
/// device (or dumped to a WAV file in mock mode) as soon as it's
/// received. Write failures are logged, never fatal to the caller.
pub struct OutputSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl OutputSink {
    pub fn write(&self, pcm: Vec<u8>) {
        if self.tx.try_send(pcm).is_err() {
            tracing::warn!("output sink channel full or closed, dropping chunk");
        }
    }
}

/// Opens the output stream (or mock WAV-dump sink) once at startup and
/// returns a handle to feed it PCM chunks.
pub fn spawn_output(cfg: OutputConfig) -> OutputSink {
    let (tx, rx) = mpsc::channel(100);
    if let Some(path) = cfg.mock_wav_path.clone() {
        tokio::spawn(run_wav_dump(path, cfg, rx));
    } else {
        std::thread::spawn(move || {
            if let Err(err) = run_live_output(cfg, rx) {
                tracing::error!("output stream failed: {err}");
            }
        });
    }
    OutputSink { tx }
}

async fn run_wav_dump(path: PathBuf, cfg: OutputConfig, mut rx: mpsc::Receiver<Vec<u8>>) {
    let spec = hound::WavSpec {
        channels: cfg.channels,
        sample_rate: cfg.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = match hound::WavWriter::create(&path, spec) {
        Ok(w) => w,
        Err(err) => {
            tracing::error!("failed to open mock output WAV {}: {err}", path.display());
            return;
        }
    };

    while let Some(chunk) = rx.recv().await {
        for sample in chunk.chunks_exact(4) {
            let value = i32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]);
            if let Err(err) = writer.write_sample(value) {
                tracing::warn!("mock output write failed: {err}");
                break;
            }
        }
    }
    if let Err(err) = writer.finalize() {
        tracing::warn!("mock output finalize failed: {err}");
    }
}

fn run_live_output(cfg: OutputConfig, mut rx: mpsc::Receiver<Vec<u8>>) -> Result<(), AudioError> {
    let manager = DeviceManager::new();
    let device = manager.open_output(cfg.device_name.as_deref())?;
    let default_config = device
        .default_output_config()
        .map_err(|_| AudioError::FormatNotSupported {
            format: "no default output config".to_string(),
        })?;
    let sample_format = default_config.sample_format();
    let stream_config: StreamConfig = StreamConfig {
        channels: cfg.channels,
        sample_rate: cpal::SampleRate(cfg.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let (feed_tx, feed_rx) = std_mpsc::channel::<Vec<i32>>();
    let err_fn = |err: cpal::StreamError| tracing::error!("output stream error: {err}");
    let mut pending: Vec<i32> = Vec::new();

    let stream = match sample_format {
        SampleFormat::I32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [i32], _| fill_output(data, &feed_rx, &mut pending),
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| {
                let mut ints = vec![0i32; data.len()];
                fill_output(&mut ints, &feed_rx, &mut pending);
                for (dst, src) in data.iter_mut().zip(ints.iter()) {
                    *dst = *src as f32 / i32::MAX as f32;
                }
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{other:?}"),
            })
        }
    }
    .map_err(AudioError::from)?;

    stream.play().map_err(AudioError::from)?;
    tracing::info!(
        "audio output stream started at {}Hz/{}ch",
        cfg.sample_rate,
        cfg.channels
    );

    while let Some(chunk) = rx.blocking_recv() {
        let samples: Vec<i32> = chunk
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        if feed_tx.send(samples).is_err() {
            break;
        }
    }
    Ok(())
}

fn fill_output(data: &mut [i32], feed_rx: &std_mpsc::Receiver<Vec<i32>>, pending: &mut Vec<i32>) {
    let mut filled = 0;
    while filled < data.len() {
        if pending.is_empty() {
            match feed_rx.try_recv() {
                Ok(chunk) => *pending = chunk,
                Err(_) => break,
            }
        }
        let take = (data.len() - filled).min(pending.len());
        data[filled..filled + take].copy_from_slice(&pending[..take]);
        pending.drain(..take);
        filled += take;
    }
    for sample in &mut data[filled..] {
        *sample = 0;
    }
}
