//! Turn-taking FSM and session/turn history.
//!
//! One `OrchestratorState` is shared (via `Arc`) across the SR-text task,
//! the button-event task, and the SIGINT shutdown handler, so the mutex is
//! held only for the plain data access, never across an `.await`.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use vocalis_foundation::{SessionLog, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmState {
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl FsmState {
    pub fn name(self) -> &'static str {
        match self {
            FsmState::Idle => "IDLE",
            FsmState::Listening => "LISTENING",
            FsmState::Processing => "PROCESSING",
            FsmState::Speaking => "SPEAKING",
        }
    }
}

struct Inner {
    fsm: FsmState,
    history: Vec<Turn>,
    last_tts_end: Option<Instant>,
}

pub struct OrchestratorState {
    inner: Mutex<Inner>,
    log: SessionLog,
    session_timeout: Duration,
}

impl OrchestratorState {
    pub fn new(log: SessionLog, session_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                fsm: FsmState::Idle,
                history: Vec::new(),
                last_tts_end: None,
            }),
            log,
            session_timeout,
        }
    }

    pub fn set_fsm(&self, state: FsmState) {
        let mut inner = self.inner.lock();
        if inner.fsm != state {
            tracing::info!(from = inner.fsm.name(), to = state.name(), "state transition");
        }
        inner.fsm = state;
    }

    pub fn fsm(&self) -> FsmState {
        self.inner.lock().fsm
    }

    pub fn add_user_turn(&self, text: &str) {
        self.inner.lock().history.push(Turn {
            role: "user",
            content: text.to_string(),
        });
    }

    pub fn add_assistant_turn(&self, text: String) {
        self.inner.lock().history.push(Turn {
            role: "assistant",
            content: text,
        });
    }

    pub fn update_tts_end(&self) {
        self.inner.lock().last_tts_end = Some(Instant::now());
    }

    pub fn history_snapshot(&self) -> Vec<Turn> {
        self.inner.lock().history.clone()
    }

    /// Checks whether the elapsed time since the last turn ended exceeds
    /// the session timeout, and if so logs and clears the prior history.
    /// Must be called before the current utterance is added to history,
    /// matching the reference ordering (check against the *previous*
    /// session, not the one about to start).
    pub fn check_timeout_and_maybe_clear(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.history.is_empty() {
            return false;
        }
        let timed_out = match inner.last_tts_end {
            Some(last) => last.elapsed() > self.session_timeout,
            None => true,
        };
        if timed_out {
            tracing::info!("session timed out, logging and clearing history");
            self.log.append(&inner.history);
            inner.history.clear();
        }
        timed_out
    }

    /// Button-triggered RESET: unconditionally logs and clears, regardless
    /// of elapsed time.
    pub fn reset_session(&self) {
        let mut inner = self.inner.lock();
        self.log.append(&inner.history);
        inner.history.clear();
    }

    /// Final flush on shutdown.
    pub fn log_final(&self) {
        let inner = self.inner.lock();
        self.log.append(&inner.history);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_timeout(millis: u64) -> OrchestratorState {
        let dir = tempfile::tempdir().unwrap();
        OrchestratorState::new(
            SessionLog::new(dir.path().join("sessions.jsonl"), true),
            Duration::from_millis(millis),
        )
    }

    #[test]
    fn starts_idle_with_empty_history() {
        let state = state_with_timeout(1000);
        assert_eq!(state.fsm(), FsmState::Idle);
        assert!(state.history_snapshot().is_empty());
    }

    #[test]
    fn empty_history_never_times_out() {
        let state = state_with_timeout(1);
        assert!(!state.check_timeout_and_maybe_clear());
    }

    #[test]
    fn recent_turn_does_not_time_out() {
        let state = state_with_timeout(1000);
        state.add_user_turn("hello");
        state.update_tts_end();
        assert!(!state.check_timeout_and_maybe_clear());
        assert_eq!(state.history_snapshot().len(), 1);
    }

    #[test]
    fn stale_turn_times_out_and_clears() {
        let state = state_with_timeout(5);
        state.add_user_turn("hello");
        state.update_tts_end();
        std::thread::sleep(Duration::from_millis(20));
        assert!(state.check_timeout_and_maybe_clear());
        assert!(state.history_snapshot().is_empty());
    }

    #[test]
    fn reset_session_clears_regardless_of_elapsed_time() {
        let state = state_with_timeout(1000);
        state.add_user_turn("hello");
        state.update_tts_end();
        state.reset_session();
        assert!(state.history_snapshot().is_empty());
    }

    #[test]
    fn set_fsm_updates_current_state() {
        let state = state_with_timeout(1000);
        state.set_fsm(FsmState::Listening);
        assert_eq!(state.fsm(), FsmState::Listening);
    }
}
