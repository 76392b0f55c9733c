// ── FIMP message model ──
//
// FIMP is JSON over MQTT. A message names its service (`serv`), its
// command or event type (`type`), a value type tag (`val_t`) and the value
// itself; the topic carries the addressing:
//
//   pt:j1/mt:cmd/rt:dev/rn:lvi/ad:1/sv:thermostat/ad:4411_0
//   pt:j1/mt:evt/rt:ad/rn:lvi/ad:1

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::CoreError;

/// String properties attached to a message (`props`).
pub type Props = BTreeMap<String, String>;

// ── Value type ───────────────────────────────────────────────────────

/// The `val_t` tag describing the shape of `val`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    Null,
    StrArray,
    IntArray,
    FloatArray,
    StrMap,
    IntMap,
    FloatMap,
    BoolMap,
    Object,
    Base64,
    Bin,
}

// ── Message ──────────────────────────────────────────────────────────

/// A single FIMP message, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FimpMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(rename = "serv")]
    pub service: String,
    #[serde(rename = "val_t")]
    pub value_type: ValueType,
    #[serde(default)]
    pub val: Value,
    #[serde(default)]
    pub props: Option<Props>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub ctime: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub corid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resp_to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src: String,
    #[serde(default = "default_version")]
    pub ver: String,
}

fn default_version() -> String {
    "1".into()
}

impl FimpMessage {
    /// A fresh message with a new `uid` and the current `ctime`.
    pub fn new(
        msg_type: impl Into<String>,
        service: impl Into<String>,
        value_type: ValueType,
        val: Value,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            service: service.into(),
            value_type,
            val,
            props: None,
            tags: None,
            ctime: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            uid: uuid::Uuid::new_v4().to_string(),
            corid: String::new(),
            resp_to: String::new(),
            src: "lvibridge".into(),
            ver: default_version(),
        }
    }

    pub fn string(msg_type: &str, service: &str, val: impl Into<String>) -> Self {
        Self::new(msg_type, service, ValueType::String, Value::String(val.into()))
    }

    pub fn str_map(msg_type: &str, service: &str, val: &Props) -> Self {
        let map = val
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self::new(msg_type, service, ValueType::StrMap, Value::Object(map))
    }

    /// An `object` message; fails only if `val` cannot be represented as JSON.
    pub fn object<T: Serialize>(msg_type: &str, service: &str, val: &T) -> Result<Self, CoreError> {
        let val = serde_json::to_value(val)
            .map_err(|e| CoreError::Internal(format!("cannot encode {msg_type}: {e}")))?;
        Ok(Self::new(msg_type, service, ValueType::Object, val))
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    /// Mark this message as the answer to `request`.
    pub fn correlated_with(mut self, request: &FimpMessage) -> Self {
        self.corid.clone_from(&request.uid);
        self
    }

    // ── Value accessors ──────────────────────────────────────────────

    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.as_ref()?.get(key).map(String::as_str)
    }

    pub fn string_value(&self) -> Result<&str, CoreError> {
        self.val
            .as_str()
            .ok_or_else(|| CoreError::parse(format!("{}: expected string value", self.msg_type)))
    }

    /// `val` as a string map. Non-string members are rendered as JSON text.
    pub fn str_map_value(&self) -> Result<Props, CoreError> {
        let map = self
            .val
            .as_object()
            .ok_or_else(|| CoreError::parse(format!("{}: expected str_map value", self.msg_type)))?;
        Ok(map
            .iter()
            .map(|(k, v)| {
                let s = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), s)
            })
            .collect())
    }

    pub fn object_value<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_value(self.val.clone())
            .map_err(|e| CoreError::parse(format!("{}: {e}", self.msg_type)))
    }
}

// ── Addressing ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum MsgType {
    #[strum(serialize = "cmd")]
    Command,
    #[strum(serialize = "evt")]
    Event,
    #[strum(serialize = "rsp")]
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ResourceType {
    #[strum(serialize = "dev")]
    Device,
    #[strum(serialize = "ad")]
    Adapter,
    #[strum(serialize = "app")]
    App,
    #[strum(serialize = "cloud")]
    Cloud,
}

/// A parsed FIMP topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub payload_type: String,
    pub msg_type: MsgType,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub resource_address: String,
    pub service_name: Option<String>,
    pub service_address: Option<String>,
}

impl Address {
    /// `pt:j1/mt:evt/rt:ad/rn:<adapter>/ad:1`
    pub fn adapter_event(adapter: &str) -> Self {
        Self {
            payload_type: "j1".into(),
            msg_type: MsgType::Event,
            resource_type: ResourceType::Adapter,
            resource_name: adapter.into(),
            resource_address: "1".into(),
            service_name: None,
            service_address: None,
        }
    }

    /// `pt:j1/mt:evt/rt:dev/rn:<adapter>/ad:1/sv:<service>/ad:<address>`
    pub fn device_event(adapter: &str, service: &str, address: &str) -> Self {
        Self {
            resource_type: ResourceType::Device,
            service_name: Some(service.into()),
            service_address: Some(address.into()),
            ..Self::adapter_event(adapter)
        }
    }

    /// The service address, or the resource address for adapter topics.
    pub fn target(&self) -> &str {
        self.service_address
            .as_deref()
            .unwrap_or(&self.resource_address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pt:{}/mt:{}/rt:{}/rn:{}/ad:{}",
            self.payload_type,
            self.msg_type,
            self.resource_type,
            self.resource_name,
            self.resource_address
        )?;
        if let (Some(sv), Some(ad)) = (&self.service_name, &self.service_address) {
            write!(f, "/sv:{sv}/ad:{ad}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(topic: &str) -> Result<Self, Self::Err> {
        let bad = |why: &str| CoreError::parse(format!("topic {topic:?}: {why}"));

        let segments = topic
            .trim_matches('/')
            .split('/')
            .map(|seg| {
                seg.split_once(':')
                    .ok_or_else(|| bad("segment without prefix"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let field = |idx: usize, prefix: &str| -> Result<String, CoreError> {
            match segments.get(idx) {
                Some((p, v)) if *p == prefix => Ok((*v).to_owned()),
                _ => Err(bad(&format!("expected {prefix}: at segment {idx}"))),
            }
        };

        let payload_type = field(0, "pt")?;
        let msg_type = field(1, "mt")?
            .parse()
            .map_err(|_| bad("unknown message type"))?;
        let resource_type = field(2, "rt")?
            .parse()
            .map_err(|_| bad("unknown resource type"))?;
        let resource_name = field(3, "rn")?;
        let resource_address = field(4, "ad")?;

        let (service_name, service_address) = match segments.len() {
            5 => (None, None),
            7 => (Some(field(5, "sv")?), Some(field(6, "ad")?)),
            _ => return Err(bad("unexpected number of segments")),
        };

        Ok(Self {
            payload_type,
            msg_type,
            resource_type,
            resource_name,
            resource_address,
            service_name,
            service_address,
        })
    }
}

// ── Inbound envelope ─────────────────────────────────────────────────

/// A message as received from the bus, with its parsed topic.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub address: Address,
    pub message: FimpMessage,
}

impl Inbound {
    pub fn parse(topic: &str, payload: &[u8]) -> Result<Self, CoreError> {
        let address = topic.parse()?;
        let message = serde_json::from_slice(payload)
            .map_err(|e| CoreError::parse(format!("payload on {topic}: {e}")))?;
        Ok(Self { address, message })
    }
}
