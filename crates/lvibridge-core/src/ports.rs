// ── Outbound ports ──
//
// Collaborators the router drives but does not own the implementation
// of: the bus publisher, the persisted state file and the log filter.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::fimp::FimpMessage;
use crate::session::Session;

/// Publishes FIMP messages on a topic.
pub trait BusPublisher: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        message: &FimpMessage,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Loads and saves the adapter's persisted state.
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedState>, CoreError>;

    fn save(&self, state: &PersistedState) -> Result<(), CoreError>;
}

/// Runtime control of the log filter.
pub trait LogControl: Send + Sync {
    /// Apply a level such as `debug` or `warn`. Rejects unknown levels.
    fn set_level(&self, level: &str) -> Result<(), CoreError>;

    /// Apply the level saved from a previous run. Implementations may keep
    /// a level the operator pinned at startup instead.
    fn apply_persisted(&self, level: &str) -> Result<(), CoreError> {
        self.set_level(level)
    }
}

// ── Persisted state ──────────────────────────────────────────────────

/// Adapter settings editable from the bus. Secrets are never stored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSettings {
    #[serde(default)]
    pub log_level: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub access_key: String,
}

impl AdapterSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(level) = patch.log_level {
            self.log_level = level;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(access_key) = patch.access_key {
            self.access_key = access_key;
        }
    }
}

/// Partial update carried by `cmd.config.extended_set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    pub log_level: Option<String>,
    pub username: Option<String>,
    pub access_key: Option<String>,
}

/// Everything written to the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub settings: AdapterSettings,
    #[serde(default)]
    pub session: Session,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn patch_only_touches_given_fields() {
        let mut settings = AdapterSettings {
            log_level: "info".into(),
            username: "old@example.com".into(),
            access_key: "key".into(),
        };
        let patch: SettingsPatch = serde_json::from_value(json!({"log_level": "debug"})).unwrap();
        settings.apply(patch);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.username, "old@example.com");
        assert_eq!(settings.access_key, "key");
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let patch = serde_json::from_value::<SettingsPatch>(json!({"password": "x"}));
        assert!(patch.is_err());
    }
}
