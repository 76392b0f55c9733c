// Persisted adapter state (`<work_dir>/state.toml`)

use std::path::{Path, PathBuf};

use lvibridge_core::{CoreError, PersistedState, StateStore};
use tracing::debug;

use crate::ConfigError;

/// `StateStore` backed by a TOML file.
#[derive(Debug, Clone)]
pub struct TomlStateStore {
    path: PathBuf,
}

impl TomlStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<PersistedState>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let state = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    fn write(&self, state: &PersistedState) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(state)?;
        std::fs::write(&self.path, toml_str)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

impl StateStore for TomlStateStore {
    fn load(&self) -> Result<Option<PersistedState>, CoreError> {
        Ok(self.read()?)
    }

    fn save(&self, state: &PersistedState) -> Result<(), CoreError> {
        Ok(self.write(state)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use lvibridge_core::AdapterSettings;

    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlStateStore::new(dir.path().join("state.toml"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlStateStore::new(dir.path().join("nested/state.toml"));
        let state = PersistedState {
            settings: AdapterSettings {
                log_level: "debug".into(),
                username: "user@example.com".into(),
                access_key: "key-1".into(),
            },
            ..PersistedState::default()
        };

        store.save(&state).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("[settings]"));
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn garbage_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "settings = [").unwrap();

        let err = TomlStateStore::new(path).load().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
