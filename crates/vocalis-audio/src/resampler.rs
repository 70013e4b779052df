use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Streaming mono resampler using Rubato's linear interpolator.
///
/// Unlike the sinc-based path, linear interpolation trades fidelity for
/// latency and per-chunk cost, which is what the VAD ingest path and the
/// cross-service reformatter both want: small, bounded chunks with state
/// carried across calls rather than one large offline pass.
pub struct LinearResampler {
    in_rate: u32,
    out_rate: u32,
    resampler: Option<FastFixedIn<f32>>,
    input_buffer: Vec<f32>,
    output_buffer: Vec<f32>,
    chunk_size: usize,
}

impl LinearResampler {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        let chunk_size = 256;
        let resampler = if in_rate == out_rate {
            None
        } else {
            Some(
                FastFixedIn::<f32>::new(
                    out_rate as f64 / in_rate as f64,
                    2.0,
                    PolynomialDegree::Linear,
                    chunk_size,
                    1,
                )
                .expect("failed to construct linear resampler"),
            )
        };

        Self {
            in_rate,
            out_rate,
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            output_buffer: Vec::new(),
            chunk_size,
        }
    }

    /// Processes an arbitrary-length chunk of mono f32 samples (in
    /// `[-1.0, 1.0]`), returning whatever resampled output is ready.
    /// Input that doesn't fill a full internal chunk is buffered for the
    /// next call.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let Some(resampler) = self.resampler.as_mut() else {
            return input.to_vec();
        };

        self.input_buffer.extend_from_slice(input);

        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            match resampler.process(&[chunk], None) {
                Ok(frames) => {
                    if let Some(channel) = frames.first() {
                        self.output_buffer.extend_from_slice(channel);
                    }
                }
                Err(err) => {
                    tracing::warn!("linear resampler error: {err}");
                }
            }
        }

        std::mem::take(&mut self.output_buffer)
    }

    /// Clears carried state: pending input, buffered output, and the
    /// resampler's own internal history. Called at stream/turn
    /// boundaries so stale samples from a prior utterance never bleed
    /// into the next one.
    pub fn reset(&mut self) {
        self.input_buffer.clear();
        self.output_buffer.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_same_rate() {
        let mut rs = LinearResampler::new(16_000, 16_000);
        let input = vec![0.1f32, 0.2, 0.3, 0.4];
        assert_eq!(rs.process(&input), input);
    }

    #[test]
    fn downsample_produces_fewer_samples() {
        let mut rs = LinearResampler::new(48_000, 16_000);
        let input: Vec<f32> = (0..4800).map(|i| ((i % 100) as f32 - 50.0) / 50.0).collect();
        let mut out = rs.process(&input);
        out.extend(rs.process(&input));
        assert!(!out.is_empty());
        assert!(out.len() < input.len());
    }

    #[test]
    fn reset_clears_pending_input() {
        let mut rs = LinearResampler::new(48_000, 16_000);
        rs.process(&[0.0f32; 10]);
        rs.reset();
        assert!(rs.input_buffer.is_empty());
        assert!(rs.output_buffer.is_empty());
    }
}
