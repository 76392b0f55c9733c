// ── Inclusion report ──
//
// Capability descriptor announced for a heater: a thermostat service for
// setpoints and a sensor_temp service for the room temperature.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::command::{SENSOR_TEMP, THERMOSTAT};
use crate::fimp::ValueType;
use crate::model::Device;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionReport {
    pub address: String,
    pub product_name: String,
    pub product_id: String,
    pub manufacturer_id: String,
    pub device_id: String,
    pub comm_tech: String,
    pub power_source: String,
    pub wakeup_interval: String,
    pub category: String,
    pub services: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub alias: String,
    pub address: String,
    pub enabled: bool,
    pub groups: Vec<String>,
    pub props: serde_json::Map<String, Value>,
    pub interfaces: Vec<Interface>,
}

/// One message a service accepts (`in`) or emits (`out`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub intf_t: String,
    pub msg_t: String,
    pub val_t: ValueType,
    pub ver: String,
}

impl Interface {
    fn input(msg_t: &str, val_t: ValueType) -> Self {
        Self {
            intf_t: "in".into(),
            msg_t: msg_t.into(),
            val_t,
            ver: "1".into(),
        }
    }

    fn output(msg_t: &str, val_t: ValueType) -> Self {
        Self {
            intf_t: "out".into(),
            ..Self::input(msg_t, val_t)
        }
    }
}

impl InclusionReport {
    pub fn for_device(device: &Device, adapter: &str) -> Self {
        Self {
            address: device.id.clone(),
            product_name: device.label.clone(),
            product_id: "lvi_heater".into(),
            manufacturer_id: "lvi".into(),
            device_id: device.id.clone(),
            comm_tech: "cloud".into(),
            power_source: "ac".into(),
            wakeup_interval: "-1".into(),
            category: "heater".into(),
            services: vec![thermostat(device, adapter), sensor(device, adapter)],
        }
    }
}

fn service_address(adapter: &str, service: &str, device_id: &str) -> String {
    format!("/rt:dev/rn:{adapter}/ad:1/sv:{service}/ad:{device_id}")
}

fn thermostat(device: &Device, adapter: &str) -> ServiceDescriptor {
    let mut props = serde_json::Map::new();
    props.insert("sup_modes".into(), json!(["heat"]));
    props.insert("sup_setpoints".into(), json!(["heat"]));
    if let Some(min) = device.min_setpoint {
        props.insert("sup_range_min".into(), json!(min));
    }
    if let Some(max) = device.max_setpoint {
        props.insert("sup_range_max".into(), json!(max));
    }

    ServiceDescriptor {
        name: THERMOSTAT.into(),
        alias: "Thermostat".into(),
        address: service_address(adapter, THERMOSTAT, &device.id),
        enabled: true,
        groups: vec!["ch_0".into()],
        props,
        interfaces: vec![
            Interface::input("cmd.setpoint.set", ValueType::StrMap),
            Interface::input("cmd.setpoint.get_report", ValueType::String),
            Interface::input("cmd.mode.set", ValueType::String),
            Interface::input("cmd.mode.get_report", ValueType::Null),
            Interface::output("evt.setpoint.report", ValueType::StrMap),
            Interface::output("evt.mode.report", ValueType::String),
        ],
    }
}

fn sensor(device: &Device, adapter: &str) -> ServiceDescriptor {
    let mut props = serde_json::Map::new();
    props.insert("sup_units".into(), json!(["C"]));

    ServiceDescriptor {
        name: SENSOR_TEMP.into(),
        alias: "Temperature sensor".into(),
        address: service_address(adapter, SENSOR_TEMP, &device.id),
        enabled: true,
        groups: vec!["ch_0".into()],
        props,
        interfaces: vec![
            Interface::input("cmd.sensor.get_report", ValueType::Null),
            Interface::output("evt.sensor.report", ValueType::Float),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetTemperatures;

    #[test]
    fn report_describes_both_services() {
        let device = Device {
            id: "4411".into(),
            label: "Panel".into(),
            home_id: Some("201".into()),
            room_id: None,
            current_temp: 20.5,
            target_temps: TargetTemperatures::default(),
            min_setpoint: Some(5.0),
            max_setpoint: None,
            power_status: true,
            heating_up: false,
            available: true,
        };

        let report = InclusionReport::for_device(&device, "lvi");
        assert_eq!(report.address, "4411");
        assert_eq!(report.product_name, "Panel");

        let names: Vec<_> = report.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, [THERMOSTAT, SENSOR_TEMP]);

        let thermo = &report.services[0];
        assert_eq!(thermo.address, "/rt:dev/rn:lvi/ad:1/sv:thermostat/ad:4411");
        assert_eq!(thermo.props.get("sup_range_min"), Some(&json!(5.0)));
        assert!(!thermo.props.contains_key("sup_range_max"));
        assert!(
            thermo
                .interfaces
                .iter()
                .any(|i| i.msg_t == "cmd.setpoint.set" && i.intf_t == "in")
        );
    }
}
