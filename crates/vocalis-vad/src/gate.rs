use crate::classifier::VadClassifier;
use crate::config::HangoverConfig;
use std::time::Instant;
use vocalis_proto::VadStatus;

/// What the gate decided for one chunk: whether to emit the audio at
/// all, and whether a status transition happened (status packets are
/// only emitted on transitions, never repeated frame after frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutput {
    pub emit_audio: bool,
    pub status: Option<VadStatus>,
}

/// The hangover-gate state machine: speech keeps emitting audio and
/// flips status to `SpeechDetected`; silence within the hangover window
/// still emits audio under `SpeechHangover`; silence past the window
/// emits only a `Silence` status transition and stops emitting audio.
pub struct HangoverGate {
    classifier: Box<dyn VadClassifier>,
    hangover: std::time::Duration,
    prev_status: VadStatus,
    last_speech: Option<Instant>,
}

impl HangoverGate {
    pub fn new(classifier: Box<dyn VadClassifier>, config: HangoverConfig) -> Self {
        Self {
            classifier,
            hangover: config.hangover,
            prev_status: VadStatus::Unknown,
            last_speech: None,
        }
    }

    pub fn process(&mut self, chunk: &[i16], now: Instant) -> GateOutput {
        let is_speech = self.classifier.classify(chunk);

        if is_speech {
            self.last_speech = Some(now);
            let status = self.transition_to(VadStatus::SpeechDetected);
            return GateOutput {
                emit_audio: true,
                status,
            };
        }

        if let Some(last_speech) = self.last_speech {
            if now.saturating_duration_since(last_speech) < self.hangover {
                let status = self.transition_to(VadStatus::SpeechHangover);
                return GateOutput {
                    emit_audio: true,
                    status,
                };
            }
        }

        self.last_speech = None;
        let status = self.transition_to(VadStatus::Silence);
        GateOutput {
            emit_audio: false,
            status,
        }
    }

    fn transition_to(&mut self, status: VadStatus) -> Option<VadStatus> {
        if self.prev_status == status {
            None
        } else {
            self.prev_status = status;
            Some(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FixedClassifier(bool);
    impl VadClassifier for FixedClassifier {
        fn classify(&self, _chunk: &[i16]) -> bool {
            self.0
        }
    }

    fn gate(hangover_ms: i64, speech: bool) -> HangoverGate {
        let cfg = HangoverConfig::from_millis(hangover_ms).unwrap();
        HangoverGate::new(Box::new(FixedClassifier(speech)), cfg)
    }

    #[test]
    fn first_silent_frame_emits_silence_status() {
        let mut gate = gate(500, false);
        let out = gate.process(&[], Instant::now());
        assert_eq!(out.status, Some(VadStatus::Silence));
        assert!(!out.emit_audio);
    }

    #[test]
    fn speech_emits_audio_and_status_once() {
        let mut gate = gate(500, true);
        let now = Instant::now();
        let first = gate.process(&[1, 2, 3], now);
        assert_eq!(first.status, Some(VadStatus::SpeechDetected));
        assert!(first.emit_audio);

        let second = gate.process(&[1, 2, 3], now);
        assert_eq!(second.status, None, "no duplicate status on repeated speech");
        assert!(second.emit_audio);
    }

    #[test]
    fn silence_within_hangover_window_still_emits_audio() {
        let cfg = HangoverConfig::from_millis(200).unwrap();
        let mut gate = HangoverGate::new(Box::new(FixedClassifier(true)), cfg);
        let t0 = Instant::now();
        gate.process(&[1], t0);

        gate.classifier = Box::new(FixedClassifier(false));
        let within_window = gate.process(&[0], t0 + Duration::from_millis(100));
        assert!(within_window.emit_audio);
        assert_eq!(within_window.status, Some(VadStatus::SpeechHangover));
    }

    #[test]
    fn silence_past_hangover_window_stops_audio() {
        let cfg = HangoverConfig::from_millis(200).unwrap();
        let mut gate = HangoverGate::new(Box::new(FixedClassifier(true)), cfg);
        let t0 = Instant::now();
        gate.process(&[1], t0);

        gate.classifier = Box::new(FixedClassifier(false));
        let past_window = gate.process(&[0], t0 + Duration::from_millis(300));
        assert!(!past_window.emit_audio);
        assert_eq!(past_window.status, Some(VadStatus::Silence));
    }
}
