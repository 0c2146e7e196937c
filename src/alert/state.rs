use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterState {
    #[serde(default)]
    pub current_interval: Option<String>,
}

/// Active interval per parameter, persisted between runs as
/// `{"<parameter>": {"current_interval": "<name>" | null}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertState {
    parameters: IndexMap<String, ParameterState>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the state file. A file that does not exist yet is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read alert state: {}", path.display()));
            }
        };

        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse alert state: {}", path.display()))
    }

    /// Like [`AlertState::load`], but an unreadable file is logged and replaced
    /// by an empty state. Every parameter then alerts once on its next value.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "Starting with empty alert state");
            Self::default()
        })
    }

    /// Writes the state file through a temporary sibling so a crash never
    /// leaves a truncated file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("failed to serialize alert state")?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");

        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write alert state: {}", path.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace alert state: {}", path.display()))?;

        Ok(())
    }

    pub fn current_interval(&self, parameter: &str) -> Option<&str> {
        self.parameters
            .get(parameter)
            .and_then(|p| p.current_interval.as_deref())
    }

    pub fn set_current_interval(&mut self, parameter: &str, interval: &str) {
        self.parameters
            .entry(parameter.to_owned())
            .or_default()
            .current_interval = Some(interval.to_owned());
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParameterState)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert_state.json");

        let mut state = AlertState::new();
        state.set_current_interval("temperature", "normal");
        state.set_current_interval("aqi", "good");
        state.set_current_interval("aqi", "moderate");
        state.save(&path).unwrap();

        let loaded = AlertState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.current_interval("temperature"), Some("normal"));
        assert_eq!(loaded.current_interval("aqi"), Some("moderate"));
        assert_eq!(loaded.current_interval("noise"), None);
    }

    #[test]
    fn file_format_matches_flat_json_object() {
        let mut state = AlertState::new();
        state.set_current_interval("noise", "quiet");

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "noise": { "current_interval": "quiet" } })
        );
    }

    #[test]
    fn null_interval_is_accepted() {
        let state: AlertState =
            serde_json::from_str(r#"{"gas": {"current_interval": null}, "aqi": {}}"#).unwrap();
        assert_eq!(state.current_interval("gas"), None);
        assert_eq!(state.current_interval("aqi"), None);
        assert_eq!(state.parameters().count(), 2);
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = AlertState::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(state, AlertState::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert_state.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(AlertState::load(&path).is_err());
        assert_eq!(AlertState::load_or_default(&path), AlertState::default());
    }
}
