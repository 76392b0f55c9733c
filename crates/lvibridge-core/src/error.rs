// ── Core error types ──
//
// Errors surfaced by the router, session manager and registry. Vendor
// transport details are folded into `Transport` / `Vendor` by the
// `From<lvibridge_api::Error>` impl below.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Vendor errors ────────────────────────────────────────────────
    #[error("Vendor API unreachable: {message}")]
    Transport { message: String },

    #[error("Vendor API error: {message}")]
    Vendor {
        message: String,
        /// The vendor `errorCode`, or the HTTP status for non-200 replies.
        code: Option<i64>,
    },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ── Inbound message errors ───────────────────────────────────────
    #[error("Malformed payload: {message}")]
    Parse { message: String },

    #[error("Address not found: {address}")]
    AddressNotFound { address: String },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Bus error: {message}")]
    Bus { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// The vendor error code, if any, rendered for status reports.
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Vendor { code: Some(c), .. } => Some(c.to_string()),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lvibridge_api::Error> for CoreError {
    fn from(err: lvibridge_api::Error) -> Self {
        match err {
            lvibridge_api::Error::Authentication { message } => CoreError::Auth { message },
            lvibridge_api::Error::Transport(ref e) => CoreError::Transport {
                message: e.to_string(),
            },
            lvibridge_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid vendor URL: {e}"),
            },
            lvibridge_api::Error::ClientBuild(message) => CoreError::Config { message },
            lvibridge_api::Error::Http { status, message } => CoreError::Vendor {
                message: format!("HTTP {status}: {message}"),
                code: Some(i64::from(status)),
            },
            lvibridge_api::Error::Vendor { code, message } => CoreError::Vendor {
                message,
                code: Some(code),
            },
            lvibridge_api::Error::Deserialization { message, .. } => CoreError::Vendor {
                message: format!("unexpected response: {message}"),
                code: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_error_keeps_code() {
        let err: CoreError = lvibridge_api::Error::Vendor {
            code: 30_002,
            message: "token invalid".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Vendor { code: Some(30_002), .. }));
        assert_eq!(err.code().as_deref(), Some("30002"));
    }

    #[test]
    fn api_auth_maps_to_auth() {
        let err: CoreError = lvibridge_api::Error::Authentication {
            message: "no authorization code in response".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Auth { .. }));
        assert_eq!(err.code(), None);
    }
}
