// ── Domain model ──
//
// Homes, rooms and heaters as the adapter sees them. Relationships are
// carried by id (`Room::home_id`, `Device::room_id`) so the snapshot stays
// three flat collections.

use serde::{Deserialize, Serialize};

/// A home ("smarthome") owning a set of rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
    pub id: String,
    pub mac_address: String,
    pub label: String,
    pub general_mode: String,
    pub holiday_mode: bool,
}

/// A room ("zone") inside a home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub zone_id: String,
    pub home_id: String,
    pub name: String,
    pub zone_type: String,
    pub position: String,
}

/// Target temperature per heating program, in °C.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetTemperatures {
    pub comfort: Option<f64>,
    pub eco: Option<f64>,
    pub frost_protection: Option<f64>,
    pub boost: Option<f64>,
    pub manual: Option<f64>,
}

/// A heater.
///
/// `room_id` is `None` for independent devices, which hang directly off
/// a home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub label: String,
    pub home_id: Option<String>,
    pub room_id: Option<String>,
    pub current_temp: f64,
    pub target_temps: TargetTemperatures,
    pub min_setpoint: Option<f64>,
    pub max_setpoint: Option<f64>,
    pub power_status: bool,
    pub heating_up: bool,
    pub available: bool,
}

impl Device {
    pub fn is_independent(&self) -> bool {
        self.room_id.is_none()
    }

    /// Attach the device to its place in the hierarchy.
    pub fn placed(mut self, home_id: &str, room_id: Option<&str>) -> Self {
        self.home_id = Some(home_id.to_owned());
        self.room_id = room_id.map(str::to_owned);
        self
    }
}

/// Position of a device in the current snapshot.
///
/// Only valid for the snapshot it was resolved against; a resync
/// invalidates every index handed out before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIndex(usize);

impl DeviceIndex {
    pub(crate) fn new(idx: usize) -> Self {
        Self(idx)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// The three collections of the registry, always replaced together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub homes: Vec<Home>,
    pub rooms: Vec<Room>,
    pub devices: Vec<Device>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.homes.is_empty() && self.rooms.is_empty() && self.devices.is_empty()
    }
}
