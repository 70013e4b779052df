use vocalis_proto::VadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterCommand {
    Start,
    Stop,
    Reset,
}

/// What the caller (the owner of the utterance buffer and the worker
/// slot) should do in response to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEffect {
    pub reset_buffer: bool,
    pub cancel_worker: bool,
}

/// Tracks the `speaking`/`pending_transcription` flags that decide when
/// to drain the utterance buffer and spawn a transcription worker. Pure
/// state machine — it owns no audio and spawns nothing itself.
#[derive(Default)]
pub struct SpeechSegmenter {
    is_listening: bool,
    speaking: bool,
    pending_transcription: bool,
}

impl SpeechSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_command(&mut self, cmd: SegmenterCommand) -> CommandEffect {
        match cmd {
            SegmenterCommand::Start => {
                self.is_listening = true;
                self.speaking = false;
                self.pending_transcription = false;
                CommandEffect {
                    reset_buffer: true,
                    cancel_worker: false,
                }
            }
            SegmenterCommand::Stop => {
                self.is_listening = false;
                // Flush whatever remains, even mid-utterance.
                self.pending_transcription = true;
                CommandEffect {
                    reset_buffer: false,
                    cancel_worker: false,
                }
            }
            SegmenterCommand::Reset => {
                self.is_listening = false;
                self.speaking = false;
                self.pending_transcription = false;
                CommandEffect {
                    reset_buffer: true,
                    cancel_worker: true,
                }
            }
        }
    }

    /// Feeds one VAD status transition. No-op while not listening.
    pub fn on_status(&mut self, status: VadStatus) {
        if !self.is_listening {
            return;
        }
        match status {
            VadStatus::SpeechDetected | VadStatus::SpeechHangover => {
                self.speaking = true;
            }
            VadStatus::Silence => {
                if self.speaking {
                    self.speaking = false;
                    self.pending_transcription = true;
                }
            }
            VadStatus::Unknown => {}
        }
    }

    /// Call once per tick. Returns `true` (and clears the pending flag)
    /// exactly when a transcription should be spawned: there's
    /// something pending and no worker is currently running.
    pub fn take_pending_if_idle(&mut self, worker_busy: bool) -> bool {
        if self.pending_transcription && !worker_busy {
            self.pending_transcription = false;
            true
        } else {
            false
        }
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_to_silence_marks_pending() {
        let mut seg = SpeechSegmenter::new();
        seg.apply_command(SegmenterCommand::Start);
        seg.on_status(VadStatus::SpeechDetected);
        seg.on_status(VadStatus::Silence);
        assert!(seg.take_pending_if_idle(false));
    }

    #[test]
    fn pending_not_taken_while_worker_busy() {
        let mut seg = SpeechSegmenter::new();
        seg.apply_command(SegmenterCommand::Start);
        seg.on_status(VadStatus::SpeechDetected);
        seg.on_status(VadStatus::Silence);
        assert!(!seg.take_pending_if_idle(true));
        assert!(seg.take_pending_if_idle(false), "still pending once worker frees up");
    }

    #[test]
    fn status_ignored_while_not_listening() {
        let mut seg = SpeechSegmenter::new();
        seg.on_status(VadStatus::SpeechDetected);
        seg.on_status(VadStatus::Silence);
        assert!(!seg.take_pending_if_idle(false));
    }

    #[test]
    fn stop_flushes_remaining_audio() {
        let mut seg = SpeechSegmenter::new();
        seg.apply_command(SegmenterCommand::Start);
        seg.on_status(VadStatus::SpeechDetected);
        let effect = seg.apply_command(SegmenterCommand::Stop);
        assert!(!effect.reset_buffer);
        assert!(seg.take_pending_if_idle(false));
    }

    #[test]
    fn reset_cancels_and_clears_everything() {
        let mut seg = SpeechSegmenter::new();
        seg.apply_command(SegmenterCommand::Start);
        seg.on_status(VadStatus::SpeechDetected);
        seg.on_status(VadStatus::Silence);
        let effect = seg.apply_command(SegmenterCommand::Reset);
        assert!(effect.reset_buffer);
        assert!(effect.cancel_worker);
        assert!(!seg.take_pending_if_idle(false));
    }
}
