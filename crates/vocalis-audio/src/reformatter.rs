use crate::resampler::LinearResampler;

/// Integer PCM sample widths the reformatter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    S16,
    S32,
}

/// Pure PCM reformatter: channel mixing, linear resampling, and integer
/// sample-width conversion in one pass. Holds one resampler per output
/// channel so per-channel interpolation state survives across calls;
/// `reset()` clears that state at turn boundaries.
pub struct Reformatter {
    target_rate: u32,
    target_channels: u16,
    target_width: SampleWidth,
    resamplers: Vec<LinearResampler>,
    src_rate: Option<u32>,
}

impl Reformatter {
    pub fn new(target_rate: u32, target_channels: u16, target_width: SampleWidth) -> Self {
        Self {
            target_rate,
            target_channels,
            target_width,
            resamplers: Vec::new(),
            src_rate: None,
        }
    }

    /// Converts one chunk of interleaved PCM from `(src_rate,
    /// src_channels, src_width)` to the configured target format.
    pub fn process(
        &mut self,
        bytes: &[u8],
        src_rate: u32,
        src_channels: u16,
        src_width: SampleWidth,
    ) -> Vec<u8> {
        let src_samples = decode_interleaved(bytes, src_width);
        let frames = mix_channels(&src_samples, src_channels, self.target_channels);

        self.ensure_resamplers(src_rate);
        let resampled = self.resample_interleaved(&frames);

        let narrowed = convert_width(&resampled, src_width, self.target_width);
        encode_interleaved(&narrowed, self.target_width)
    }

    /// Clears all per-channel resampler state. Call at the start of
    /// each new TTS turn so the tail of one utterance never bleeds a
    /// click artifact into the next.
    pub fn reset(&mut self) {
        for r in &mut self.resamplers {
            r.reset();
        }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    pub fn target_channels(&self) -> u16 {
        self.target_channels
    }

    fn ensure_resamplers(&mut self, src_rate: u32) {
        let channels = self.target_channels as usize;
        if self.src_rate != Some(src_rate) || self.resamplers.len() != channels {
            self.resamplers = (0..channels)
                .map(|_| LinearResampler::new(src_rate, self.target_rate))
                .collect();
            self.src_rate = Some(src_rate);
        }
    }

    fn resample_interleaved(&mut self, interleaved: &[i32]) -> Vec<i32> {
        let channels = self.target_channels as usize;
        if channels == 0 || self.resamplers.is_empty() {
            return interleaved.to_vec();
        }

        let mut per_channel: Vec<Vec<f32>> = vec![Vec::new(); channels];
        for (i, &sample) in interleaved.iter().enumerate() {
            per_channel[i % channels].push(sample as f32);
        }

        let mut resampled_channels: Vec<Vec<f32>> = Vec::with_capacity(channels);
        for (ch, samples) in per_channel.into_iter().enumerate() {
            resampled_channels.push(self.resamplers[ch].process(&samples));
        }

        let out_frames = resampled_channels.iter().map(Vec::len).min().unwrap_or(0);
        let mut out = Vec::with_capacity(out_frames * channels);
        for frame in 0..out_frames {
            for channel in &resampled_channels {
                out.push(channel[frame].round() as i32);
            }
        }
        out
    }
}

/// 1↔2 channel conversion; any other ratio passes through unchanged
/// (logged once by the caller, not the pure conversion itself).
fn mix_channels(samples: &[i32], src_channels: u16, dst_channels: u16) -> Vec<i32> {
    match (src_channels, dst_channels) {
        (a, b) if a == b => samples.to_vec(),
        (1, 2) => samples.iter().flat_map(|&s| [s, s]).collect(),
        (2, 1) => samples
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2)
            .collect(),
        _ => {
            tracing::warn!(
                src_channels,
                dst_channels,
                "unsupported channel conversion ratio, passing through"
            );
            samples.to_vec()
        }
    }
}

fn decode_interleaved(bytes: &[u8], width: SampleWidth) -> Vec<i32> {
    match width {
        SampleWidth::S16 => bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32)
            .collect(),
        SampleWidth::S32 => bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    }
}

fn encode_interleaved(samples: &[i32], width: SampleWidth) -> Vec<u8> {
    match width {
        SampleWidth::S16 => samples
            .iter()
            .flat_map(|&s| (s as i16).to_le_bytes())
            .collect(),
        SampleWidth::S32 => samples.iter().flat_map(|&s| s.to_le_bytes()).collect(),
    }
}

fn convert_width(samples: &[i32], src: SampleWidth, dst: SampleWidth) -> Vec<i32> {
    match (src, dst) {
        (a, b) if a == b => samples.to_vec(),
        (SampleWidth::S16, SampleWidth::S32) => samples.iter().map(|&s| s << 16).collect(),
        (SampleWidth::S32, SampleWidth::S16) => samples
            .iter()
            .map(|&s| (s >> 16).clamp(i16::MIN as i32, i16::MAX as i32))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_to_stereo_duplicates() {
        assert_eq!(mix_channels(&[10, 20], 1, 2), vec![10, 10, 20, 20]);
    }

    #[test]
    fn stereo_to_mono_averages() {
        assert_eq!(mix_channels(&[10, 20, 100, 200], 2, 1), vec![15, 150]);
    }

    #[test]
    fn widen_s16_to_s32_shifts_left() {
        assert_eq!(
            convert_width(&[1, -1], SampleWidth::S16, SampleWidth::S32),
            vec![1 << 16, -1 << 16]
        );
    }

    #[test]
    fn narrow_s32_to_s16_saturates() {
        let huge = i32::MAX;
        let narrowed = convert_width(&[huge], SampleWidth::S32, SampleWidth::S16);
        assert_eq!(narrowed, vec![i16::MAX as i32]);
    }

    #[test]
    fn reformatter_round_trips_byte_length_for_identity_format() {
        let mut rf = Reformatter::new(16_000, 1, SampleWidth::S16);
        let bytes: Vec<u8> = (0..512i16).flat_map(|s| s.to_le_bytes()).collect();
        let out = rf.process(&bytes, 16_000, 1, SampleWidth::S16);
        assert_eq!(out.len(), bytes.len());
    }

    #[test]
    fn reformatter_1to2_16k_to_48k_16to32() {
        let mut rf = Reformatter::new(48_000, 2, SampleWidth::S32);
        let bytes: Vec<u8> = (0..160i16).flat_map(|s| s.to_le_bytes()).collect();
        let out = rf.process(&bytes, 16_000, 1, SampleWidth::S16);
        // 2 channels * 4 bytes per S32 sample; non-empty and 4-byte aligned per frame.
        assert!(!out.is_empty());
        assert_eq!(out.len() % 8, 0);
    }

    #[test]
    fn reset_clears_resampler_state() {
        let mut rf = Reformatter::new(48_000, 1, SampleWidth::S16);
        let bytes: Vec<u8> = vec![0u8; 320];
        rf.process(&bytes, 16_000, 1, SampleWidth::S16);
        rf.reset();
        for r in &rf.resamplers {
            assert!(r.input_rate() > 0);
        }
    }
}
