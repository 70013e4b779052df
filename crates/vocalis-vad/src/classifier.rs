/// Pure speech/non-speech classifier over one chunk of mono 16-bit PCM.
/// Unlike the gate built on top of it, a classifier carries no state
/// across calls.
pub trait VadClassifier: Send {
    fn classify(&self, chunk: &[i16]) -> bool;
}

/// Deterministic reference classifier: RMS-to-dBFS against a configurable
/// floor. No model weights, no warm-up — useful as the default and as a
/// drop-in for tests that need reproducible speech/silence boundaries.
pub struct EnergyThresholdClassifier {
    floor_db: f32,
}

impl EnergyThresholdClassifier {
    pub fn new(floor_db: f32) -> Self {
        Self { floor_db }
    }

    pub fn dbfs(&self, chunk: &[i16]) -> f32 {
        if chunk.is_empty() {
            return -100.0;
        }
        let sum_squares: i64 = chunk.iter().map(|&s| (s as i64) * (s as i64)).sum();
        let mean_square = sum_squares as f64 / chunk.len() as f64;
        let rms = (mean_square.sqrt() / 32768.0) as f32;
        if rms <= 1e-10 {
            -100.0
        } else {
            20.0 * rms.log10()
        }
    }
}

impl Default for EnergyThresholdClassifier {
    fn default() -> Self {
        Self::new(-40.0)
    }
}

impl VadClassifier for EnergyThresholdClassifier {
    fn classify(&self, chunk: &[i16]) -> bool {
        self.dbfs(chunk) > self.floor_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_not_speech() {
        let classifier = EnergyThresholdClassifier::default();
        assert!(!classifier.classify(&[0i16; 512]));
    }

    #[test]
    fn full_scale_is_speech() {
        let classifier = EnergyThresholdClassifier::default();
        assert!(classifier.classify(&[32767i16; 512]));
    }

    #[test]
    fn empty_chunk_is_not_speech() {
        let classifier = EnergyThresholdClassifier::default();
        assert!(!classifier.classify(&[]));
    }
}
