// ── Inbound commands ──
//
// Every (service, type) pair the router handles, as typed enums. Parsing
// is the only place message type strings are matched; anything that does
// not parse is dropped by the router.

use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoStaticStr};

pub const THERMOSTAT: &str = "thermostat";
pub const SENSOR_TEMP: &str = "sensor_temp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
pub enum ThermostatCommand {
    #[strum(serialize = "cmd.setpoint.set")]
    SetpointSet,
    #[strum(serialize = "cmd.setpoint.get_report")]
    SetpointGetReport,
    #[strum(serialize = "cmd.mode.set")]
    ModeSet,
    #[strum(serialize = "cmd.mode.get_report")]
    ModeGetReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
pub enum SensorCommand {
    #[strum(serialize = "cmd.sensor.get_report")]
    GetReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
pub enum AdapterCommand {
    #[strum(serialize = "cmd.auth.login")]
    Login,
    #[strum(serialize = "cmd.network.get_all_nodes")]
    GetAllNodes,
    #[strum(serialize = "cmd.app.get_manifest")]
    GetManifest,
    #[strum(serialize = "cmd.app.get_state")]
    GetState,
    #[strum(serialize = "cmd.config.get_extended_report")]
    GetExtendedReport,
    #[strum(serialize = "cmd.config.extended_set")]
    ExtendedSet,
    #[strum(serialize = "cmd.log.set_level")]
    SetLogLevel,
    #[strum(serialize = "cmd.system.reconnect")]
    Reconnect,
    #[strum(serialize = "cmd.app.factory_reset")]
    FactoryReset,
    #[strum(serialize = "cmd.thing.get_inclusion_report")]
    GetInclusionReport,
    #[strum(serialize = "cmd.thing.inclusion")]
    Inclusion,
    #[strum(serialize = "cmd.thing.delete")]
    Delete,
}

/// A recognised inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Thermostat(ThermostatCommand),
    Sensor(SensorCommand),
    Adapter(AdapterCommand),
}

impl Command {
    /// Map a `serv`/`type` pair to a command. `adapter` is the adapter's
    /// own service name.
    pub fn parse(service: &str, msg_type: &str, adapter: &str) -> Option<Self> {
        match service {
            THERMOSTAT => ThermostatCommand::from_str(msg_type)
                .ok()
                .map(Self::Thermostat),
            SENSOR_TEMP => SensorCommand::from_str(msg_type).ok().map(Self::Sensor),
            s if s == adapter => AdapterCommand::from_str(msg_type).ok().map(Self::Adapter),
            _ => None,
        }
    }

    /// Commands that cannot do anything useful without a live vendor session.
    pub fn needs_vendor(self) -> bool {
        matches!(
            self,
            Self::Thermostat(ThermostatCommand::SetpointSet)
                | Self::Adapter(AdapterCommand::GetAllNodes)
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Thermostat(c) => c.into(),
            Self::Sensor(c) => c.into(),
            Self::Adapter(c) => c.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    const ADAPTER: &str = "lvi";

    const HANDLED: &[(&str, &str)] = &[
        (THERMOSTAT, "cmd.setpoint.set"),
        (THERMOSTAT, "cmd.setpoint.get_report"),
        (THERMOSTAT, "cmd.mode.set"),
        (THERMOSTAT, "cmd.mode.get_report"),
        (SENSOR_TEMP, "cmd.sensor.get_report"),
        (ADAPTER, "cmd.auth.login"),
        (ADAPTER, "cmd.network.get_all_nodes"),
        (ADAPTER, "cmd.app.get_manifest"),
        (ADAPTER, "cmd.app.get_state"),
        (ADAPTER, "cmd.config.get_extended_report"),
        (ADAPTER, "cmd.config.extended_set"),
        (ADAPTER, "cmd.log.set_level"),
        (ADAPTER, "cmd.system.reconnect"),
        (ADAPTER, "cmd.app.factory_reset"),
        (ADAPTER, "cmd.thing.get_inclusion_report"),
        (ADAPTER, "cmd.thing.inclusion"),
        (ADAPTER, "cmd.thing.delete"),
    ];

    #[test]
    fn every_handled_pair_parses_to_a_distinct_command() {
        let mut seen = HashSet::new();
        for (service, msg_type) in HANDLED {
            let cmd = Command::parse(service, msg_type, ADAPTER)
                .unwrap_or_else(|| panic!("{service} / {msg_type} not dispatched"));
            assert_eq!(cmd.name(), *msg_type);
            assert!(seen.insert(cmd), "{msg_type} dispatched twice");
        }

        let total = ThermostatCommand::iter().count()
            + SensorCommand::iter().count()
            + AdapterCommand::iter().count();
        assert_eq!(total, HANDLED.len());
    }

    #[test]
    fn unlisted_pairs_are_rejected() {
        assert_eq!(Command::parse(THERMOSTAT, "cmd.sensor.get_report", ADAPTER), None);
        assert_eq!(Command::parse(SENSOR_TEMP, "cmd.setpoint.set", ADAPTER), None);
        assert_eq!(Command::parse("other", "cmd.auth.login", ADAPTER), None);
        assert_eq!(Command::parse(ADAPTER, "cmd.unknown", ADAPTER), None);
        assert_eq!(Command::parse(ADAPTER, "evt.auth.status_report", ADAPTER), None);
    }

    #[test]
    fn vendor_bound_commands() {
        let vendor: Vec<_> = HANDLED
            .iter()
            .filter_map(|(s, t)| Command::parse(s, t, ADAPTER))
            .filter(|c| c.needs_vendor())
            .map(Command::name)
            .collect();
        assert_eq!(vendor, ["cmd.setpoint.set", "cmd.network.get_all_nodes"]);
    }
}
