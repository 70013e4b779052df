use parking_lot::Mutex;

/// Accumulates validated utterance audio as float32. The only
/// operations are append, atomic drain, and reset — no read-in-place,
/// so the segmentation worker always gets a consistent snapshot.
#[derive(Default)]
pub struct UtteranceBuffer {
    samples: Mutex<Vec<f32>>,
}

impl UtteranceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_i16(&self, samples: &[i16]) {
        let mut buf = self.samples.lock();
        buf.extend(samples.iter().map(|&s| s as f32 / 32768.0));
    }

    /// Atomically takes everything accumulated so far, leaving the
    /// buffer empty.
    pub fn drain(&self) -> Vec<f32> {
        std::mem::take(&mut *self.samples.lock())
    }

    pub fn reset(&self) {
        self.samples.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_drain_empties_buffer() {
        let buf = UtteranceBuffer::new();
        buf.append_i16(&[0, 16384, -16384]);
        assert_eq!(buf.len(), 3);
        let drained = buf.drain();
        assert_eq!(drained.len(), 3);
        assert!(buf.is_empty());
    }

    #[test]
    fn reset_clears_without_returning_samples() {
        let buf = UtteranceBuffer::new();
        buf.append_i16(&[1, 2, 3]);
        buf.reset();
        assert!(buf.is_empty());
    }

    #[test]
    fn pcm_i16_to_f32_scaling() {
        let buf = UtteranceBuffer::new();
        buf.append_i16(&[32767]);
        let drained = buf.drain();
        assert!((drained[0] - 0.99997).abs() < 1e-3);
    }
}
