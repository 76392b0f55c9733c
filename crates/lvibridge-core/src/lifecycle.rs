// ── Adapter lifecycle ──
//
// The app/config/auth/connection states reported to the bus in manifest
// and config reports.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    #[default]
    Starting,
    NotConfigured,
    Configured,
    Running,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigState {
    #[default]
    NotConfigured,
    InProgress,
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthState {
    #[default]
    NotAuthenticated,
    InProgress,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

/// Current adapter states as shown in `evt.app.manifest_report`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub app: AppState,
    pub config: ConfigState,
    pub auth: AuthState,
    pub connection: ConnectionState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_error: String,
}

impl Lifecycle {
    pub fn set_app(&mut self, state: AppState) {
        if self.app != state {
            debug!(from = %self.app, to = %state, "app state");
            self.app = state;
        }
    }

    pub fn set_config(&mut self, state: ConfigState) {
        if self.config != state {
            debug!(from = %self.config, to = %state, "config state");
            self.config = state;
        }
    }

    pub fn set_auth(&mut self, state: AuthState) {
        if self.auth != state {
            debug!(from = %self.auth, to = %state, "auth state");
            self.auth = state;
        }
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    /// Authenticated and configured: ready to serve.
    pub fn mark_configured(&mut self) {
        self.set_auth(AuthState::Authenticated);
        self.set_config(ConfigState::Configured);
        self.set_app(AppState::Running);
        self.last_error.clear();
    }

    pub fn mark_error(&mut self, error: impl Into<String>) {
        self.set_app(AppState::Error);
        self.last_error = error.into();
    }

    /// Back to a fresh, unconfigured install.
    pub fn reset(&mut self) {
        self.set_app(AppState::NotConfigured);
        self.set_config(ConfigState::NotConfigured);
        self.set_auth(AuthState::NotAuthenticated);
        self.last_error.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn serializes_screaming_case() {
        let mut lc = Lifecycle::default();
        lc.mark_configured();
        let json = serde_json::to_value(&lc).unwrap();
        assert_eq!(json["app"], "RUNNING");
        assert_eq!(json["config"], "CONFIGURED");
        assert_eq!(json["auth"], "AUTHENTICATED");
        assert!(json.get("last_error").is_none());
    }

    #[test]
    fn reset_clears_error() {
        let mut lc = Lifecycle::default();
        lc.mark_error("boom");
        assert_eq!(lc.app, AppState::Error);
        lc.reset();
        assert_eq!(lc.app, AppState::NotConfigured);
        assert!(lc.last_error.is_empty());
    }
}
