// Vendor API response types
//
// All responses share the `LviResponse<T>` envelope. The vendor is loose
// with scalar types: the same field arrives as `"21.5"`, `21.5` or `null`
// depending on firmware and endpoint, so scalar fields go through the
// lenient deserializers in `lenient`.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard vendor response envelope.
///
/// ```json
/// { "errorCode": 0, "message": "", "statusCode": 200, "success": true, "data": { ... } }
/// ```
#[derive(Debug, Deserialize)]
pub struct LviResponse<T> {
    #[serde(default, rename = "errorCode", deserialize_with = "lenient::error_code")]
    pub error_code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "statusCode", deserialize_with = "lenient::int")]
    pub status_code: i64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
}

// ── Authentication ───────────────────────────────────────────────────

/// `data` of `user/auth`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthCodeData {
    #[serde(default, deserialize_with = "lenient::string")]
    pub authorization_code: String,
}

/// Token pair returned by `share/applyAccessToken` and `share/refreshtoken`.
///
/// Expiry fields are absolute epoch milliseconds.
#[derive(Clone, Default, Deserialize)]
pub struct LviTokens {
    #[serde(default, deserialize_with = "lenient::string")]
    pub access_token: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub refresh_token: String,
    #[serde(default, rename = "expireTime", deserialize_with = "lenient::int")]
    pub expire_time: i64,
    #[serde(
        default,
        rename = "refresh_expireTime",
        deserialize_with = "lenient::int"
    )]
    pub refresh_expire_time: i64,
}

impl std::fmt::Debug for LviTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LviTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expire_time", &self.expire_time)
            .field("refresh_expire_time", &self.refresh_expire_time)
            .finish()
    }
}

impl LviTokens {
    /// Both tokens present and both expiry timestamps set.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && self.expire_time > 0
            && self.refresh_expire_time > 0
    }
}

// ── Listing payloads ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct HomeListData {
    #[serde(default, rename = "homeList")]
    pub homes: Vec<LviHome>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoomListData {
    #[serde(default, rename = "roomList")]
    pub rooms: Vec<LviRoom>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceListData {
    #[serde(default, rename = "deviceList")]
    pub devices: Vec<LviDevice>,
}

// ── Home ─────────────────────────────────────────────────────────────

/// A home ("smarthome") as returned by `uds/selectHomeList`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LviHome {
    #[serde(default, alias = "homeId", deserialize_with = "lenient::string")]
    pub smarthome_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub mac_address: String,
    #[serde(default, alias = "homeName", deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub general_mode: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub holiday_mode: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sync_flag: String,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Room ─────────────────────────────────────────────────────────────

/// A room ("zone") as returned by `uds/selectRoombyHome2020`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LviRoom {
    #[serde(default, alias = "roomId", deserialize_with = "lenient::string")]
    pub zone_id: String,
    #[serde(default, alias = "roomName", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub num_zone: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub label_zone_type: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub picto_zone_type: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub zone_img_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address_position: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Device ───────────────────────────────────────────────────────────

/// A heater as returned by the room and independent-device listings.
///
/// Setpoints use the vendor's French names: `consigne_confort` (comfort),
/// `consigne_eco`, `consigne_hg` (frost protection), `consigne_boost` and
/// `consigne_manuel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LviDevice {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, alias = "deviceId", deserialize_with = "lenient::string")]
    pub device_id: String,
    #[serde(default, alias = "deviceName", deserialize_with = "lenient::string")]
    pub nom_appareil: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub num_zone: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub id_appareil: String,
    #[serde(default, deserialize_with = "lenient::float")]
    pub current_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub consigne_confort: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub consigne_hg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub consigne_eco: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub consigne_boost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub consigne_manuel: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub min_set_point: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub max_set_point: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub temperature_air: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub temperature_sol: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub power_status: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub heating_up: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub available: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub smarthome_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LviDevice {
    /// The identifier the control endpoint expects.
    ///
    /// Older payloads only carry `id`; newer ones carry both.
    pub fn control_id(&self) -> &str {
        if self.device_id.is_empty() {
            &self.id
        } else {
            &self.device_id
        }
    }
}

// ── Device control ───────────────────────────────────────────────────

/// `operation` query parameter of `uds/deviceControlForOpenApi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOperation {
    /// Switch the heater on/off; `status` carries the mode.
    Mode,
    /// Hold a temperature; `status` must be 1.
    Setpoint,
}

impl ControlOperation {
    pub fn code(self) -> u8 {
        match self {
            Self::Mode => 0,
            Self::Setpoint => 1,
        }
    }
}

/// Parameters for a single device-control call.
#[derive(Debug, Clone)]
pub struct DeviceControl {
    pub device_id: String,
    pub hold_temp: String,
    pub operation: ControlOperation,
    pub status: u8,
}

impl DeviceControl {
    /// Hold `temp` (whole degrees) on the given device.
    pub fn setpoint(device_id: impl Into<String>, temp: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            hold_temp: temp.into(),
            operation: ControlOperation::Setpoint,
            status: 1,
        }
    }
}

// ── Lenient scalar decoding ──────────────────────────────────────────

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Stand-in for an `errorCode` the vendor sent in an unreadable form.
    pub const UNREADABLE_ERROR_CODE: i64 = -1;

    /// Any scalar rendered as a string; `null` becomes empty.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        })
    }

    /// Numbers or numeric strings; blanks and garbage become `None`.
    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        })
    }

    /// Integers or integer strings; anything else becomes 0.
    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        })
    }

    /// Like [`int`], but a code that is present and not an integer decodes
    /// as [`UNREADABLE_ERROR_CODE`] so it can never pass as success.
    pub fn error_code<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(UNREADABLE_ERROR_CODE),
            Some(Value::String(s)) if s.trim().is_empty() => 0,
            Some(Value::String(s)) => s.trim().parse().unwrap_or(UNREADABLE_ERROR_CODE),
            Some(_) => UNREADABLE_ERROR_CODE,
        })
    }

    /// `true`/`false`, `1`/`0` and their string spellings.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v.abs() > f64::EPSILON),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            ),
            _ => false,
        })
    }
}
