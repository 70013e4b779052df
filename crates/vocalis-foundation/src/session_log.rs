//! Append-only session log: the only persistence this pipeline does.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct LoggedSession {
    timestamp: String,
    history: Vec<Turn>,
}

/// Appends one JSON line per flushed session. A no-op if the history is
/// empty, matching the reference behavior of never writing empty sessions.
pub struct SessionLog {
    path: PathBuf,
    enabled: bool,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    pub fn append(&self, history: &[Turn]) {
        if !self.enabled || history.is_empty() {
            return;
        }
        if let Err(err) = self.try_append(history) {
            tracing::error!("failed to log session: {err}");
        }
    }

    fn try_append(&self, history: &[Turn]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let record = LoggedSession {
            timestamp: chrono::Utc::now().to_rfc3339(),
            history: history.to_vec(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        tracing::info!(path = %self.path.display(), "session logged");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn skips_empty_history() {
        let dir = tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("sessions.jsonl"), true);
        log.append(&[]);
        assert!(!log.path().exists());
    }

    #[test]
    fn appends_one_line_per_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.jsonl");
        let log = SessionLog::new(&path, true);
        let history = vec![
            Turn { role: "user", content: "hello".into() },
            Turn { role: "assistant", content: "hi".into() },
        ];
        log.append(&history);
        log.append(&history);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first["history"][0]["role"], "user");
    }

    #[test]
    fn disabled_logger_never_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.jsonl");
        let log = SessionLog::new(&path, false);
        log.append(&[Turn { role: "user", content: "hi".into() }]);
        assert!(!path.exists());
    }
}
