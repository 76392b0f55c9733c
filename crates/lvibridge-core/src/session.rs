// ── Session manager ──
//
// Owns the vendor token pair and decides, per inbound message, whether it
// is still valid, needs a refresh, or is past saving. Timestamps are
// epoch milliseconds, as the vendor reports them.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::gateway::{TokenGrant, VendorGateway};

// ── Credentials ──────────────────────────────────────────────────────

/// Account and API-registration credentials for the two-step login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    /// API access key (sent as `smarthome_id`).
    pub access_key: String,
    /// API secret token (sent as `token`).
    pub secret_token: SecretString,
}

impl Credentials {
    /// First empty field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        use secrecy::ExposeSecret;

        if self.username.is_empty() {
            Some("username")
        } else if self.password.expose_secret().is_empty() {
            Some("password")
        } else if self.access_key.is_empty() {
            Some("access_key")
        } else if self.secret_token.expose_secret().is_empty() {
            Some("secret_token")
        } else {
            None
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// The current token state.
///
/// A non-empty access token always comes with `expire_at > 0`; the only
/// constructors are `Session::default()` and `Session::from_grant`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    authorization_code: String,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expire_at: i64,
    #[serde(default)]
    refresh_expire_at: i64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |s: &str| if s.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("Session")
            .field("authorization_code", &mark(&self.authorization_code))
            .field("access_token", &mark(&self.access_token))
            .field("refresh_token", &mark(&self.refresh_token))
            .field("expire_at", &self.expire_at)
            .field("refresh_expire_at", &self.refresh_expire_at)
            .finish()
    }
}

impl Session {
    pub fn from_grant(authorization_code: impl Into<String>, grant: TokenGrant) -> Self {
        Self {
            authorization_code: authorization_code.into(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expire_at: grant.expire_at,
            refresh_expire_at: grant.refresh_expire_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.expire_at == 0
    }

    /// Whether a deserialized session upholds the token/expiry invariant.
    pub fn is_consistent(&self) -> bool {
        self.access_token.is_empty() || self.expire_at > 0
    }

    pub fn access_token(&self) -> Option<&str> {
        (!self.access_token.is_empty()).then_some(self.access_token.as_str())
    }

    pub fn expire_at(&self) -> i64 {
        self.expire_at
    }

    pub fn refresh_expire_at(&self) -> i64 {
        self.refresh_expire_at
    }

    fn apply_refresh(&mut self, grant: TokenGrant) {
        self.access_token = grant.access_token;
        self.refresh_token = grant.refresh_token;
        self.expire_at = grant.expire_at;
        self.refresh_expire_at = grant.refresh_expire_at;
    }
}

// ── State machine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// Access token expired; refresh attempted or pending.
    RefreshDue,
    /// Refresh token expired too; only a new login helps.
    Expired,
}

/// Result of the per-message validity check.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// No session to check.
    NotAuthenticated,
    /// Access token still valid; nothing was sent.
    Valid,
    /// Tokens were rotated in place.
    Refreshed,
    /// Refresh call failed; the stale session is kept.
    RefreshFailed(CoreError),
    /// Refresh token expired; re-authentication required.
    Expired,
}

/// Owns the session and its lifecycle state.
#[derive(Debug)]
pub struct SessionManager {
    session: Session,
    state: SessionState,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            session: Session::default(),
            state: SessionState::Unauthenticated,
        }
    }

    /// Resume from a persisted session. Inconsistent sessions are dropped.
    pub fn restore(&mut self, session: Session) {
        if !session.is_consistent() {
            warn!("persisted session has a token without expiry, ignoring it");
            return;
        }
        let next = if session.is_empty() {
            SessionState::Unauthenticated
        } else {
            SessionState::Authenticated
        };
        self.session = session;
        self.transition(next);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.access_token()
    }

    /// Two-step login. On failure the previous session is left untouched.
    pub async fn login<G: VendorGateway>(
        &mut self,
        gateway: &G,
        credentials: &Credentials,
    ) -> Result<&Session, CoreError> {
        if let Some(field) = credentials.missing_field() {
            return Err(CoreError::auth(format!("empty {field}")));
        }

        let previous = self.state;
        self.transition(SessionState::Authenticating);

        let attempt = async {
            let code = gateway.authorize(credentials).await?;
            if code.is_empty() {
                return Err(CoreError::auth("no authorization code received"));
            }
            let grant = gateway.exchange(&code, credentials).await?;
            if grant.access_token.is_empty() || grant.expire_at <= 0 {
                return Err(CoreError::auth("empty access token or expiry"));
            }
            Ok(Session::from_grant(code, grant))
        };

        match attempt.await {
            Ok(session) => {
                self.session = session;
                self.transition(SessionState::Authenticated);
                info!(expire_at = self.session.expire_at, "logged in");
                Ok(&self.session)
            }
            Err(e) => {
                self.transition(previous);
                Err(e)
            }
        }
    }

    /// Check the session against `now_ms` and refresh it if it can be.
    pub async fn refresh_if_needed<G: VendorGateway>(
        &mut self,
        gateway: &G,
        now_ms: i64,
    ) -> RefreshOutcome {
        if self.session.expire_at == 0 {
            return RefreshOutcome::NotAuthenticated;
        }
        if now_ms < self.session.expire_at {
            return RefreshOutcome::Valid;
        }
        if now_ms >= self.session.refresh_expire_at {
            self.transition(SessionState::Expired);
            return RefreshOutcome::Expired;
        }

        self.transition(SessionState::RefreshDue);
        match gateway.refresh(&self.session.refresh_token).await {
            Ok(grant) if !grant.access_token.is_empty() && grant.expire_at > 0 => {
                self.session.apply_refresh(grant);
                self.transition(SessionState::Authenticated);
                debug!(expire_at = self.session.expire_at, "session refreshed");
                RefreshOutcome::Refreshed
            }
            Ok(_) => {
                warn!("token refresh returned an empty grant, keeping stale session");
                RefreshOutcome::RefreshFailed(CoreError::auth("empty grant on refresh"))
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, keeping stale session");
                RefreshOutcome::RefreshFailed(e)
            }
        }
    }

    /// Clear every field; used by factory reset.
    pub fn reset(&mut self) {
        self.session = Session::default();
        self.transition(SessionState::Unauthenticated);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "session state transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::{Device, Home, Room};

    /// Gateway fake that counts calls and hands out fixed grants.
    #[derive(Default)]
    struct FakeGateway {
        calls: AtomicUsize,
        fail_refresh: bool,
        fail_exchange: bool,
    }

    impl FakeGateway {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn grant(tag: &str, expire_at: i64) -> TokenGrant {
        TokenGrant {
            access_token: format!("access-{tag}"),
            refresh_token: format!("refresh-{tag}"),
            expire_at,
            refresh_expire_at: expire_at + 1_000_000,
        }
    }

    impl VendorGateway for FakeGateway {
        async fn authorize(&self, _: &Credentials) -> Result<String, CoreError> {
            self.hit();
            Ok("code".into())
        }
        async fn exchange(&self, _: &str, _: &Credentials) -> Result<TokenGrant, CoreError> {
            self.hit();
            if self.fail_exchange {
                Err(CoreError::Vendor {
                    message: "denied".into(),
                    code: Some(1),
                })
            } else {
                Ok(grant("login", 10_000))
            }
        }
        async fn refresh(&self, _: &str) -> Result<TokenGrant, CoreError> {
            self.hit();
            if self.fail_refresh {
                Err(CoreError::Transport {
                    message: "down".into(),
                })
            } else {
                Ok(grant("refreshed", 50_000))
            }
        }
        async fn list_homes(&self, _: &str) -> Result<Vec<Home>, CoreError> {
            self.hit();
            Ok(Vec::new())
        }
        async fn list_rooms(&self, _: &str, _: &str) -> Result<Vec<Room>, CoreError> {
            self.hit();
            Ok(Vec::new())
        }
        async fn list_room_devices(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<Vec<Device>, CoreError> {
            self.hit();
            Ok(Vec::new())
        }
        async fn list_independent_devices(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Vec<Device>, CoreError> {
            self.hit();
            Ok(Vec::new())
        }
        async fn set_temperature(&self, _: &str, _: &str, _: &str) -> Result<(), CoreError> {
            self.hit();
            Ok(())
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "user@example.com".into(),
            password: SecretString::from("pw".to_owned()),
            access_key: "key".into(),
            secret_token: SecretString::from("tok".to_owned()),
        }
    }

    async fn logged_in(gateway: &FakeGateway) -> SessionManager {
        let mut mgr = SessionManager::new();
        mgr.login(gateway, &credentials()).await.unwrap();
        mgr
    }

    #[tokio::test]
    async fn login_populates_session() {
        let gateway = FakeGateway::default();
        let mgr = logged_in(&gateway).await;

        assert_eq!(mgr.state(), SessionState::Authenticated);
        assert_eq!(mgr.access_token(), Some("access-login"));
        assert_eq!(mgr.session().expire_at(), 10_000);
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn login_rejects_empty_fields_without_network() {
        let gateway = FakeGateway::default();
        let mut mgr = SessionManager::new();
        let mut creds = credentials();
        creds.access_key.clear();

        let err = mgr.login(&gateway, &creds).await.unwrap_err();

        assert!(matches!(err, CoreError::Auth { .. }));
        assert_eq!(gateway.calls(), 0);
        assert_eq!(mgr.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn failed_login_keeps_previous_session() {
        let ok = FakeGateway::default();
        let mut mgr = logged_in(&ok).await;
        let before = mgr.session().clone();

        let failing = FakeGateway {
            fail_exchange: true,
            ..FakeGateway::default()
        };
        assert!(mgr.login(&failing, &credentials()).await.is_err());

        assert_eq!(mgr.session(), &before);
        assert_eq!(mgr.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn valid_session_makes_no_calls() {
        let gateway = FakeGateway::default();
        let mut mgr = logged_in(&gateway).await;
        let before = mgr.session().clone();
        let calls = gateway.calls();

        let outcome = mgr.refresh_if_needed(&gateway, 9_999).await;

        assert!(matches!(outcome, RefreshOutcome::Valid));
        assert_eq!(gateway.calls(), calls);
        assert_eq!(mgr.session(), &before);
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed_in_place() {
        let gateway = FakeGateway::default();
        let mut mgr = logged_in(&gateway).await;

        let outcome = mgr.refresh_if_needed(&gateway, 10_000).await;

        assert!(matches!(outcome, RefreshOutcome::Refreshed));
        assert_eq!(mgr.access_token(), Some("access-refreshed"));
        assert_eq!(mgr.session().expire_at(), 50_000);
        assert_eq!(mgr.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_tokens() {
        let ok = FakeGateway::default();
        let mut mgr = logged_in(&ok).await;
        let failing = FakeGateway {
            fail_refresh: true,
            ..FakeGateway::default()
        };

        let outcome = mgr.refresh_if_needed(&failing, 20_000).await;

        assert!(matches!(outcome, RefreshOutcome::RefreshFailed(_)));
        assert_eq!(mgr.access_token(), Some("access-login"));
        assert_eq!(mgr.state(), SessionState::RefreshDue);
    }

    #[tokio::test]
    async fn past_refresh_expiry_is_unrecoverable() {
        let gateway = FakeGateway::default();
        let mut mgr = logged_in(&gateway).await;
        let calls = gateway.calls();

        let outcome = mgr.refresh_if_needed(&gateway, 2_000_000).await;

        assert!(matches!(outcome, RefreshOutcome::Expired));
        assert_eq!(mgr.state(), SessionState::Expired);
        assert_eq!(gateway.calls(), calls);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let gateway = FakeGateway::default();
        let mut mgr = logged_in(&gateway).await;

        mgr.reset();

        assert!(mgr.session().is_empty());
        assert_eq!(mgr.access_token(), None);
        assert_eq!(mgr.state(), SessionState::Unauthenticated);
        assert!(matches!(
            mgr.refresh_if_needed(&gateway, 1).await,
            RefreshOutcome::NotAuthenticated
        ));
    }

    #[test]
    fn debug_redacts_tokens() {
        let session = Session::from_grant("code-x", grant("secret", 1));
        let out = format!("{session:?}");
        assert!(!out.contains("access-secret"));
        assert!(!out.contains("code-x"));
    }

    #[test]
    fn restore_rejects_token_without_expiry() {
        let session: Session =
            serde_json::from_str(r#"{"access_token":"abc","expire_at":0}"#).unwrap();
        let mut mgr = SessionManager::new();
        mgr.restore(session);
        assert_eq!(mgr.access_token(), None);
    }
}
