//! Binary error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use lvibridge_config::ConfigError;
use lvibridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration value for {field}: {reason}")]
    #[diagnostic(
        code(lvibridge::invalid_config),
        help("Fix the value in the config file or the matching LVIBRIDGE_* variable.")
    )]
    Validation { field: String, reason: String },

    #[error("Could not load configuration")]
    #[diagnostic(
        code(lvibridge::config_load),
        help("Run `lvibridge config path` to see which file is read.")
    )]
    Config {
        #[source]
        source: ConfigError,
    },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Could not build the vendor API client")]
    #[diagnostic(code(lvibridge::vendor_client))]
    VendorClient {
        #[source]
        source: lvibridge_api::Error,
    },

    #[error("Could not restore adapter state: {message}")]
    #[diagnostic(
        code(lvibridge::state),
        help("Delete the state file in the adapter work_dir to start unconfigured.")
    )]
    State { message: String },

    #[error("MQTT broker error: {message}")]
    #[diagnostic(code(lvibridge::broker))]
    Broker { message: String },
}

impl BridgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            Self::Broker { .. } => exit_code::CONNECTION,
            Self::VendorClient { .. } | Self::State { .. } => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            source => Self::Config { source },
        }
    }
}

impl From<CoreError> for BridgeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Bus { message } => Self::Broker { message },
            other => Self::State {
                message: other.to_string(),
            },
        }
    }
}

impl From<lvibridge_api::Error> for BridgeError {
    fn from(source: lvibridge_api::Error) -> Self {
        Self::VendorClient { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_a_usage_error() {
        let err = BridgeError::from(ConfigError::Validation {
            field: "mqtt.port".into(),
            reason: "must be between 1 and 65535".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("mqtt.port"));
    }

    #[test]
    fn bus_failure_is_a_connection_error() {
        let err = BridgeError::from(CoreError::Bus {
            message: "broker gone".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
