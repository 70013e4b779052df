use std::time::Duration;
use vocalis_foundation::ConfigError;

/// Hangover window configuration for the gate. `hangover_ms` must be
/// strictly positive: a zero or negative hangover collapses the gate to
/// "emit status on every frame", defeating the point of debouncing
/// status transitions.
#[derive(Debug, Clone, Copy)]
pub struct HangoverConfig {
    pub hangover: Duration,
}

impl HangoverConfig {
    pub fn from_millis(hangover_ms: i64) -> Result<Self, ConfigError> {
        if hangover_ms <= 0 {
            return Err(ConfigError::NotPositive {
                field: "HANGOVER",
                value: hangover_ms,
            });
        }
        Ok(Self {
            hangover: Duration::from_millis(hangover_ms as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero() {
        assert!(HangoverConfig::from_millis(0).is_err());
    }

    #[test]
    fn rejects_negative() {
        assert!(HangoverConfig::from_millis(-1).is_err());
    }

    #[test]
    fn accepts_positive() {
        let cfg = HangoverConfig::from_millis(500).unwrap();
        assert_eq!(cfg.hangover, Duration::from_millis(500));
    }
}
