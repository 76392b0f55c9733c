// ── Command router ──
//
// Single consumer of inbound bus messages. Each message is checked
// against the session, matched to a typed `Command` and handled to
// completion before the next one is taken off the queue. The router owns
// the session manager, the registry, the lifecycle and the adapter
// settings outright; nothing else mutates them.

use std::path::PathBuf;

use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::command::{AdapterCommand, Command, SENSOR_TEMP, SensorCommand, THERMOSTAT, ThermostatCommand};
use crate::error::CoreError;
use crate::fimp::{Address, FimpMessage, Inbound, MsgType, Props, ValueType};
use crate::gateway::VendorGateway;
use crate::lifecycle::{AppState, AuthState, ConfigState, ConnectionState, Lifecycle};
use crate::manifest::{MANIFEST_STATE, load_manifest, with_state};
use crate::ports::{AdapterSettings, BusPublisher, LogControl, PersistedState, SettingsPatch, StateStore};
use crate::registry::{DeviceRegistry, normalize_address};
use crate::session::{Credentials, RefreshOutcome, SessionManager, SessionState};

const EMPTY_CREDENTIALS: &str = "Empty username or password or access_key or secret_token";
const SESSION_EXPIRED: &str = "session expired, re-authenticate";

/// Static router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Adapter service name, used as `rn:` in topics and as the adapter `serv`.
    pub service_name: String,
    pub manifest_path: PathBuf,
}

// ── Report payloads ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AuthStatus {
    status: &'static str,
    error_text: String,
    error_code: String,
}

impl AuthStatus {
    fn new(status: &'static str, error_text: impl Into<String>) -> Self {
        Self {
            status,
            error_text: error_text.into(),
            error_code: String::new(),
        }
    }
}

/// Result of a button-style action (`reconnect`, `factory_reset`).
#[derive(Debug, Serialize)]
struct ActionReport {
    op: &'static str,
    op_status: &'static str,
    next: &'static str,
    error_code: String,
    error_text: String,
}

impl ActionReport {
    fn ok(op: &'static str) -> Self {
        Self {
            op,
            op_status: "ok",
            next: "config",
            error_code: String::new(),
            error_text: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigReport<'a> {
    op_status: &'static str,
    app_state: &'a Lifecycle,
}

#[derive(Debug, Serialize)]
struct ExtendedReport<'a> {
    settings: &'a AdapterSettings,
    session_state: SessionState,
    expire_at: i64,
    refresh_expire_at: i64,
    homes: usize,
    devices: usize,
}

// ── Router ───────────────────────────────────────────────────────────

pub struct Router<G, P> {
    config: RouterConfig,
    gateway: G,
    publisher: P,
    session: SessionManager,
    registry: DeviceRegistry,
    lifecycle: Lifecycle,
    settings: AdapterSettings,
    state_store: Option<Box<dyn StateStore>>,
    log_control: Option<Box<dyn LogControl>>,
}

impl<G: VendorGateway, P: BusPublisher> Router<G, P> {
    pub fn new(config: RouterConfig, gateway: G, publisher: P) -> Self {
        Self {
            config,
            gateway,
            publisher,
            session: SessionManager::new(),
            registry: DeviceRegistry::new(),
            lifecycle: Lifecycle::default(),
            settings: AdapterSettings::default(),
            state_store: None,
            log_control: None,
        }
    }

    pub fn with_state_store(mut self, store: impl StateStore + 'static) -> Self {
        self.state_store = Some(Box::new(store));
        self
    }

    pub fn with_log_control(mut self, control: impl LogControl + 'static) -> Self {
        self.log_control = Some(Box::new(control));
        self
    }

    /// Load settings and session from the state store, if one is set.
    pub fn restore(&mut self) -> Result<(), CoreError> {
        let Some(store) = &self.state_store else {
            self.lifecycle.reset();
            return Ok(());
        };
        let state = store.load()?.unwrap_or_default();

        if !state.settings.log_level.is_empty() {
            if let Some(ctl) = &self.log_control {
                if let Err(e) = ctl.apply_persisted(&state.settings.log_level) {
                    warn!(error = %e, "ignoring persisted log level");
                }
            }
        }
        self.settings = state.settings;
        self.session.restore(state.session);

        if self.session.access_token().is_some() {
            self.lifecycle.mark_configured();
        } else {
            self.lifecycle.reset();
        }
        info!(
            app = %self.lifecycle.app,
            session = %self.session.state(),
            "state restored"
        );
        Ok(())
    }

    /// Topics the bus transport must subscribe to.
    pub fn subscriptions(&self) -> Vec<String> {
        let svc = &self.config.service_name;
        vec![
            format!("pt:j1/+/rt:dev/rn:{svc}/ad:1/#"),
            format!("pt:j1/+/rt:ad/rn:{svc}/ad:1"),
        ]
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.lifecycle.set_connection(state);
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Handle one inbound message at the current wall-clock time.
    pub async fn handle(&mut self, inbound: Inbound) {
        self.handle_at(inbound, Utc::now().timestamp_millis()).await;
    }

    /// Handle one inbound message, treating `now_ms` as the current time.
    pub async fn handle_at(&mut self, inbound: Inbound, now_ms: i64) {
        let Inbound { address, message } = inbound;
        if address.msg_type != MsgType::Command {
            trace!(msg_type = %message.msg_type, "ignoring non-command message");
            return;
        }
        let Some(command) =
            Command::parse(&message.service, &message.msg_type, &self.config.service_name)
        else {
            debug!(
                service = %message.service,
                msg_type = %message.msg_type,
                "no handler, dropping message"
            );
            return;
        };

        if self.session.session().expire_at() != 0
            && !self.check_session(&message, command, now_ms).await
        {
            return;
        }

        let target = normalize_address(address.target()).to_owned();
        debug!(command = command.name(), address = %target, "dispatching");

        let result = match command {
            Command::Thermostat(cmd) => self.handle_thermostat(cmd, &message, &target).await,
            Command::Sensor(SensorCommand::GetReport) => {
                self.sensor_report(&message, &target).await
            }
            Command::Adapter(cmd) => self.handle_adapter(cmd, &message).await,
        };

        match result {
            Ok(()) => {}
            Err(CoreError::AddressNotFound { address }) => {
                debug!(command = command.name(), %address, "unknown device, no reply");
            }
            Err(e) => warn!(command = command.name(), error = %e, "command failed"),
        }
    }

    /// Refresh the session if due. Returns `false` when the command must
    /// be skipped.
    async fn check_session(&mut self, request: &FimpMessage, command: Command, now_ms: i64) -> bool {
        match self.session.refresh_if_needed(&self.gateway, now_ms).await {
            RefreshOutcome::Refreshed => {
                self.persist();
                true
            }
            RefreshOutcome::Expired => {
                warn!("vendor session expired, re-authentication required");
                self.lifecycle.set_auth(AuthState::NotAuthenticated);
                let status = AuthStatus::new("not_authenticated", SESSION_EXPIRED);
                if let Err(e) = self.publish_auth_status(request, &status, false).await {
                    warn!(error = %e, "failed to publish expiry status");
                }
                if command.needs_vendor() {
                    debug!(command = command.name(), "skipped, session expired");
                    return false;
                }
                true
            }
            RefreshOutcome::NotAuthenticated
            | RefreshOutcome::Valid
            | RefreshOutcome::RefreshFailed(_) => true,
        }
    }

    async fn handle_thermostat(
        &mut self,
        cmd: ThermostatCommand,
        request: &FimpMessage,
        address: &str,
    ) -> Result<(), CoreError> {
        match cmd {
            ThermostatCommand::SetpointSet => self.setpoint_set(request, address).await,
            ThermostatCommand::SetpointGetReport => self.setpoint_report(request, address).await,
            ThermostatCommand::ModeSet => {
                debug!(address, "mode is always heat, ignoring mode.set");
                Ok(())
            }
            ThermostatCommand::ModeGetReport => {
                let msg = FimpMessage::string("evt.mode.report", THERMOSTAT, "heat");
                self.respond(request, self.device_topic(THERMOSTAT, address), msg)
                    .await
            }
        }
    }

    async fn handle_adapter(
        &mut self,
        cmd: AdapterCommand,
        request: &FimpMessage,
    ) -> Result<(), CoreError> {
        match cmd {
            AdapterCommand::Login => self.login(request).await,
            AdapterCommand::GetAllNodes => self.get_all_nodes(request).await,
            AdapterCommand::GetManifest => self.get_manifest(request).await,
            AdapterCommand::GetState => {
                let msg = self.adapter_object("evt.app.manifest_report", &self.lifecycle)?;
                self.respond(request, self.adapter_topic(), msg).await
            }
            AdapterCommand::GetExtendedReport => self.extended_report(request).await,
            AdapterCommand::ExtendedSet => self.extended_set(request).await,
            AdapterCommand::SetLogLevel => self.set_log_level(request),
            AdapterCommand::Reconnect => self.reconnect(request).await,
            AdapterCommand::FactoryReset => self.factory_reset(request).await,
            AdapterCommand::GetInclusionReport => self.inclusion_report(request).await,
            AdapterCommand::Inclusion => {
                info!("inclusion requested, devices are added through get_all_nodes");
                Ok(())
            }
            AdapterCommand::Delete => {
                let val = request.str_map_value()?;
                let address = val
                    .get("address")
                    .ok_or_else(|| CoreError::parse("cmd.thing.delete: missing address"))?;
                info!(%address, "delete requested, devices are removed in the vendor app");
                Ok(())
            }
        }
    }

    // ── Thermostat ───────────────────────────────────────────────────

    async fn setpoint_set(&self, request: &FimpMessage, address: &str) -> Result<(), CoreError> {
        let val = request.str_map_value()?;
        let raw = val
            .get("temp")
            .ok_or_else(|| CoreError::parse("cmd.setpoint.set: missing temp"))?;
        let temp = round_setpoint(raw)?;
        if address.is_empty() {
            return Err(CoreError::AddressNotFound {
                address: address.to_owned(),
            });
        }
        let token = self
            .session
            .access_token()
            .ok_or_else(|| CoreError::auth("not logged in"))?;

        self.gateway.set_temperature(token, address, &temp).await?;
        info!(device_id = address, temp = %temp, "setpoint applied");

        let mut report = Props::new();
        report.insert(
            "type".into(),
            val.get("type").cloned().unwrap_or_else(|| "heat".into()),
        );
        report.insert("temp".into(), temp);
        report.insert("unit".into(), "C".into());
        let msg = FimpMessage::str_map("evt.setpoint.report", THERMOSTAT, &report);
        self.respond(request, self.device_topic(THERMOSTAT, address), msg)
            .await
    }

    async fn setpoint_report(&self, request: &FimpMessage, address: &str) -> Result<(), CoreError> {
        let device = self.find_device(address)?;

        let mut report = Props::new();
        report.insert("type".into(), "heat".into());
        report.insert("temp".into(), format!("{:.2}", device.current_temp));
        report.insert("unit".into(), "C".into());
        let msg = FimpMessage::str_map("evt.setpoint.report", THERMOSTAT, &report);
        self.respond(request, self.device_topic(THERMOSTAT, address), msg)
            .await
    }

    // ── Sensor ───────────────────────────────────────────────────────

    async fn sensor_report(&self, request: &FimpMessage, address: &str) -> Result<(), CoreError> {
        let device = self.find_device(address)?;

        let mut props = Props::new();
        props.insert("unit".into(), "C".into());
        let msg = FimpMessage::new(
            "evt.sensor.report",
            SENSOR_TEMP,
            ValueType::Float,
            json!(device.current_temp),
        )
        .with_props(props);
        self.respond(request, self.device_topic(SENSOR_TEMP, address), msg)
            .await
    }

    // ── Authentication ───────────────────────────────────────────────

    async fn login(&mut self, request: &FimpMessage) -> Result<(), CoreError> {
        let credentials = login_credentials(request);
        if credentials.missing_field().is_some() {
            debug!("login rejected, credential field empty");
            let status = AuthStatus::new("error", EMPTY_CREDENTIALS);
            return self.publish_auth_status(request, &status, true).await;
        }

        self.lifecycle.set_auth(AuthState::InProgress);
        let outcome = self
            .session
            .login(&self.gateway, &credentials)
            .await
            .map(|_| ());

        let status = match outcome {
            Ok(()) => {
                self.settings.username.clone_from(&credentials.username);
                self.settings.access_key.clone_from(&credentials.access_key);
                self.lifecycle.mark_configured();
                self.persist();
                AuthStatus::new("authenticated", "")
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                let auth = if self.session.access_token().is_some() {
                    AuthState::Authenticated
                } else {
                    AuthState::NotAuthenticated
                };
                self.lifecycle.set_auth(auth);
                let status = match e {
                    CoreError::Auth { .. } | CoreError::Vendor { .. } => "not_authenticated",
                    _ => "error",
                };
                AuthStatus {
                    status,
                    error_text: e.to_string(),
                    error_code: e.code().unwrap_or_default(),
                }
            }
        };
        self.publish_auth_status(request, &status, true).await
    }

    /// Publish `evt.auth.status_report`. With `reply` set the inbound
    /// `resp_to` is honoured; otherwise it goes to the adapter topic.
    async fn publish_auth_status(
        &self,
        request: &FimpMessage,
        status: &AuthStatus,
        reply: bool,
    ) -> Result<(), CoreError> {
        let msg = self.adapter_object("evt.auth.status_report", status)?;
        if reply {
            self.respond(request, self.adapter_topic(), msg).await
        } else {
            let msg = msg.correlated_with(request);
            self.publisher.publish(&self.adapter_topic(), &msg).await
        }
    }

    // ── Network ──────────────────────────────────────────────────────

    async fn get_all_nodes(&mut self, request: &FimpMessage) -> Result<(), CoreError> {
        self.registry
            .resync_all(&self.gateway, self.session.session())
            .await?;
        let msg = self.adapter_object(
            "evt.network.get_all_nodes_report",
            &self.registry.snapshot().devices,
        )?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    async fn inclusion_report(&self, request: &FimpMessage) -> Result<(), CoreError> {
        let device_id = request.string_value()?;
        let report = self
            .registry
            .resolve(device_id)
            .and_then(|idx| self.registry.inclusion_report(idx, &self.config.service_name))
            .ok_or_else(|| CoreError::AddressNotFound {
                address: device_id.to_owned(),
            })?;
        let msg = self.adapter_object("evt.thing.inclusion_report", &report)?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    // ── App and config ───────────────────────────────────────────────

    async fn get_manifest(&self, request: &FimpMessage) -> Result<(), CoreError> {
        let mode = request.string_value()?;
        let mut manifest = load_manifest(&self.config.manifest_path)?;
        if mode == MANIFEST_STATE {
            manifest = with_state(manifest, &self.lifecycle, &self.settings);
        }
        let msg = self.adapter_object("evt.app.manifest_report", &manifest)?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    async fn extended_report(&self, request: &FimpMessage) -> Result<(), CoreError> {
        let session = self.session.session();
        let snapshot = self.registry.snapshot();
        let report = ExtendedReport {
            settings: &self.settings,
            session_state: self.session.state(),
            expire_at: session.expire_at(),
            refresh_expire_at: session.refresh_expire_at(),
            homes: snapshot.homes.len(),
            devices: snapshot.devices.len(),
        };
        let msg = self.adapter_object("evt.config.extended_report", &report)?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    async fn extended_set(&mut self, request: &FimpMessage) -> Result<(), CoreError> {
        let patch: SettingsPatch = request.object_value()?;
        if let (Some(level), Some(ctl)) = (&patch.log_level, &self.log_control) {
            ctl.set_level(level)?;
        }
        self.settings.apply(patch);
        self.persist();
        debug!(settings = ?self.settings, "settings updated");

        let report = ConfigReport {
            op_status: "ok",
            app_state: &self.lifecycle,
        };
        let msg = self.adapter_object("evt.app.config_report", &report)?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    fn set_log_level(&mut self, request: &FimpMessage) -> Result<(), CoreError> {
        let level = request.string_value()?;
        if let Some(ctl) = &self.log_control {
            ctl.set_level(level)?;
        }
        info!(level, "log level updated");
        self.settings.log_level = level.to_owned();
        self.persist();
        Ok(())
    }

    async fn reconnect(&mut self, request: &FimpMessage) -> Result<(), CoreError> {
        self.lifecycle.set_config(ConfigState::Configured);
        if self.lifecycle.app != AppState::Running {
            self.lifecycle.set_app(AppState::Configured);
        }
        let msg = self.adapter_object(
            "evt.app.config_action_report",
            &ActionReport::ok("cmd.system.reconnect"),
        )?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    async fn factory_reset(&mut self, request: &FimpMessage) -> Result<(), CoreError> {
        self.session.reset();
        self.registry.clear();
        self.lifecycle.reset();
        self.settings = AdapterSettings::default();
        self.persist();
        info!("factory reset done");

        let msg = self.adapter_object(
            "evt.app.config_action_report",
            &ActionReport::ok("cmd.app.factory_reset"),
        )?;
        self.respond(request, self.adapter_topic(), msg).await
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn find_device(&self, address: &str) -> Result<&crate::model::Device, CoreError> {
        self.registry
            .find(address)
            .ok_or_else(|| CoreError::AddressNotFound {
                address: address.to_owned(),
            })
    }

    fn adapter_topic(&self) -> String {
        Address::adapter_event(&self.config.service_name).to_string()
    }

    fn device_topic(&self, service: &str, address: &str) -> String {
        Address::device_event(&self.config.service_name, service, address).to_string()
    }

    fn adapter_object<T: Serialize>(&self, msg_type: &str, val: &T) -> Result<FimpMessage, CoreError> {
        FimpMessage::object(msg_type, &self.config.service_name, val)
    }

    /// Reply to `resp_to` when the request names one, else publish on
    /// `default_topic`. Either way the reply carries the request's uid.
    async fn respond(
        &self,
        request: &FimpMessage,
        default_topic: String,
        msg: FimpMessage,
    ) -> Result<(), CoreError> {
        let msg = msg.correlated_with(request);
        let topic = if request.resp_to.is_empty() {
            default_topic
        } else {
            request.resp_to.clone()
        };
        trace!(%topic, msg_type = %msg.msg_type, "publishing");
        self.publisher.publish(&topic, &msg).await
    }

    /// Save settings and session. A failed save puts the app in the
    /// error state until the next successful configuration.
    fn persist(&mut self) {
        let Some(store) = &self.state_store else {
            return;
        };
        let state = PersistedState {
            settings: self.settings.clone(),
            session: self.session.session().clone(),
        };
        if let Err(e) = store.save(&state) {
            warn!(error = %e, "failed to persist adapter state");
            self.lifecycle.mark_error(format!("state not saved: {e}"));
        }
    }
}

/// Round a requested temperature up to a whole degree, as the vendor
/// only accepts integers.
pub fn round_setpoint(raw: &str) -> Result<String, CoreError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::parse(format!("setpoint {raw:?} is not a number")))?;
    if !value.is_finite() {
        return Err(CoreError::parse(format!("setpoint {raw:?} is not finite")));
    }
    // `+ 0.0` turns a negative zero from ceil into plain zero.
    Ok(format!("{:.0}", value.ceil() + 0.0))
}

/// Login fields from the message props, falling back to a `str_map` value.
fn login_credentials(request: &FimpMessage) -> Credentials {
    let map = request.str_map_value().unwrap_or_default();
    let field = |key: &str| -> String {
        request
            .prop(key)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .or_else(|| map.get(key).cloned())
            .unwrap_or_default()
    };
    Credentials {
        username: field("username"),
        password: SecretString::from(field("password")),
        access_key: field("access_key"),
        secret_token: SecretString::from(field("secret_token")),
    }
}

// ── Inbound loop ─────────────────────────────────────────────────────

/// What the bus transport feeds the router.
#[derive(Debug)]
pub enum BusEvent {
    Message(Inbound),
    Connection(ConnectionState),
}

/// Drain `rx` into the router until cancelled or the sender side closes.
pub async fn process_inbound<G: VendorGateway, P: BusPublisher>(
    router: &mut Router<G, P>,
    mut rx: mpsc::Receiver<BusEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                match event {
                    Some(BusEvent::Message(inbound)) => router.handle(inbound).await,
                    Some(BusEvent::Connection(state)) => router.set_connection(state),
                    None => break,
                }
            }
        }
    }
    debug!("inbound loop stopped");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    #[test]
    fn setpoint_rounds_up() {
        let cases = [
            ("21.3", "22"),
            ("21.0", "21"),
            ("21", "21"),
            (" 19.01 ", "20"),
            ("-0.5", "0"),
            ("4.999", "5"),
        ];
        for (raw, expected) in cases {
            assert_eq!(round_setpoint(raw).unwrap(), expected, "input {raw}");
        }
    }

    #[test]
    fn setpoint_rejects_non_numbers() {
        for raw in ["", "warm", "NaN", "inf", "21,5"] {
            assert!(
                matches!(round_setpoint(raw), Err(CoreError::Parse { .. })),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn credentials_prefer_props_then_value() {
        let mut props = Props::new();
        props.insert("username".into(), "user@example.com".into());
        props.insert("password".into(), String::new());
        let msg = FimpMessage::new(
            "cmd.auth.login",
            "lvi",
            ValueType::StrMap,
            json!({"password": "hunter2", "access_key": "ak", "username": "ignored"}),
        )
        .with_props(props);

        let creds = login_credentials(&msg);
        assert_eq!(creds.username, "user@example.com");
        assert_eq!(creds.password.expose_secret(), "hunter2");
        assert_eq!(creds.access_key, "ak");
        assert_eq!(creds.missing_field(), Some("secret_token"));
    }
}
