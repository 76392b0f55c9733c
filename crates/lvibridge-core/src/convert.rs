// ── API-to-domain type conversions ──
//
// Bridges raw `lvibridge_api` payloads into the domain model. Placement
// (home/room ids) is not part of the device payload; the gateway stamps
// it with `Device::placed` after conversion.

use lvibridge_api::{LviDevice, LviHome, LviRoom};

use crate::model::{Device, Home, Room, TargetTemperatures};

impl From<LviHome> for Home {
    fn from(h: LviHome) -> Self {
        Self {
            id: h.smarthome_id,
            mac_address: h.mac_address,
            label: h.label,
            general_mode: h.general_mode,
            holiday_mode: h.holiday_mode,
        }
    }
}

impl Room {
    pub(crate) fn from_api(r: LviRoom, home_id: &str) -> Self {
        Self {
            zone_id: r.zone_id,
            home_id: home_id.to_owned(),
            name: r.name,
            zone_type: r.label_zone_type,
            position: r.address_position,
        }
    }
}

impl From<LviDevice> for Device {
    fn from(d: LviDevice) -> Self {
        let id = d.control_id().to_owned();
        let home_id = (!d.smarthome_id.is_empty()).then_some(d.smarthome_id);
        Self {
            id,
            label: d.nom_appareil,
            home_id,
            room_id: None,
            current_temp: d.current_temp.unwrap_or_default(),
            target_temps: TargetTemperatures {
                comfort: d.consigne_confort,
                eco: d.consigne_eco,
                frost_protection: d.consigne_hg,
                boost: d.consigne_boost,
                manual: d.consigne_manuel,
            },
            min_setpoint: d.min_set_point,
            max_setpoint: d.max_set_point,
            power_status: d.power_status,
            heating_up: d.heating_up,
            available: d.available,
        }
    }
}
