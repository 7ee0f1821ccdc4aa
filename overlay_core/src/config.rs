use crate::error::{OverlayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Dispatcher settings, usually read from a TOML file.
///
/// ```toml
/// record_events = true
/// event_log_capacity = 1024
/// unbounded_event_log = false
/// warn_on_conflicting_masks = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Keep an [`EventLog`](crate::event_log::EventLog) of dispatched events
    pub record_events: bool,
    /// Maximum number of records kept, oldest dropped first
    pub event_log_capacity: usize,
    /// Keep every record and ignore `event_log_capacity`
    pub unbounded_event_log: bool,
    /// Log a warning when a notification allows and denies the same bit
    pub warn_on_conflicting_masks: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            record_events: true,
            event_log_capacity: 1024,
            unbounded_event_log: false,
            warn_on_conflicting_masks: true,
        }
    }
}

impl OverlayConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: OverlayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading overlay config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.record_events && !self.unbounded_event_log && self.event_log_capacity == 0 {
            return Err(OverlayError::Config(
                "event_log_capacity must be positive for a bounded event log".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_for_missing_keys() {
        let config = OverlayConfig::from_toml_str("warn_on_conflicting_masks = false").unwrap();
        assert!(config.record_events);
        assert_eq!(config.event_log_capacity, 1024);
        assert!(!config.unbounded_event_log);
        assert!(!config.warn_on_conflicting_masks);
    }

    #[test]
    fn test_unbounded_event_log() {
        let config = OverlayConfig::from_toml_str("unbounded_event_log = true").unwrap();
        assert!(config.unbounded_event_log);

        let zero = "unbounded_event_log = true\nevent_log_capacity = 0";
        assert!(OverlayConfig::from_toml_str(zero).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = OverlayConfig::from_toml_str("event_log_capacity = 0").unwrap_err();
        assert!(matches!(err, OverlayError::Config(_)));

        let ok = OverlayConfig::from_toml_str("record_events = false\nevent_log_capacity = 0");
        assert!(ok.is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        let err = OverlayConfig::from_toml_str("record_events = \"yes\"").unwrap_err();
        assert!(matches!(err, OverlayError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "event_log_capacity = 16").unwrap();

        let config = OverlayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.event_log_capacity, 16);

        let missing = OverlayConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(OverlayError::Io(_))));
    }
}
