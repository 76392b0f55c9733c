// ── Tracing setup ──
//
// The env filter sits behind a reload layer so `cmd.log.set_level` and
// `cmd.config.extended_set` can change verbosity at runtime.

use lvibridge_config::{LogFormat, LoggingConfig};
use lvibridge_core::{CoreError, LogControl};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Install the global subscriber and hand back the runtime level switch.
///
/// `RUST_LOG` wins over everything; otherwise `-v` flags override the
/// configured level. Either one also outranks the level persisted in the
/// state file; bus commands can still change it later.
pub fn init_tracing(verbosity: u8, logging: &LoggingConfig) -> ReloadLogControl {
    let directive = match verbosity {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(directive), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let output = match logging.format {
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
        LogFormat::Text => fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry().with(filter).with(output).init();
    ReloadLogControl {
        handle,
        pinned: from_env || verbosity > 0,
    }
}

/// Accepts the usual level names plus `warning`, `fatal` and `panic`.
pub fn parse_level(level: &str) -> Result<Level, CoreError> {
    let level = level.trim();
    let name = if level.eq_ignore_ascii_case("warning") {
        "warn"
    } else if level.eq_ignore_ascii_case("fatal") || level.eq_ignore_ascii_case("panic") {
        "error"
    } else {
        level
    };
    name.parse().map_err(|_| CoreError::Parse {
        message: format!("unknown log level '{level}'"),
    })
}

pub struct ReloadLogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Set when `RUST_LOG` or `-v` chose the startup filter.
    pinned: bool,
}

impl LogControl for ReloadLogControl {
    fn apply_persisted(&self, level: &str) -> Result<(), CoreError> {
        parse_level(level)?;
        if self.pinned {
            tracing::debug!(level, "startup log filter pinned, persisted level not applied");
            return Ok(());
        }
        self.set_level(level)
    }

    fn set_level(&self, level: &str) -> Result<(), CoreError> {
        let level = parse_level(level)?;
        let filter = EnvFilter::default().add_directive(LevelFilter::from_level(level).into());
        self.handle
            .reload(filter)
            .map_err(|e| CoreError::Internal(format!("log filter reload failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARNING").unwrap(), Level::WARN);
        assert_eq!(parse_level("Error").unwrap(), Level::ERROR);
        assert_eq!(parse_level("fatal").unwrap(), Level::ERROR);
        assert_eq!(parse_level(" PANIC ").unwrap(), Level::ERROR);
        assert!(matches!(parse_level("loud"), Err(CoreError::Parse { .. })));
    }

    fn control(pinned: bool) -> (reload::Layer<EnvFilter, Registry>, ReloadLogControl) {
        let (layer, handle) = reload::Layer::new(EnvFilter::new("info"));
        (layer, ReloadLogControl { handle, pinned })
    }

    fn current(ctl: &ReloadLogControl) -> String {
        ctl.handle.with_current(ToString::to_string).unwrap().to_lowercase()
    }

    #[test]
    fn pinned_filter_ignores_persisted_level() {
        let (_layer, ctl) = control(true);
        ctl.apply_persisted("debug").unwrap();
        assert_eq!(current(&ctl), "info");
        assert!(ctl.apply_persisted("loud").is_err());
    }

    #[test]
    fn pinned_filter_still_follows_bus_commands() {
        let (_layer, ctl) = control(true);
        ctl.set_level("debug").unwrap();
        assert!(current(&ctl).contains("debug"));
    }

    #[test]
    fn unpinned_filter_takes_persisted_level() {
        let (_layer, ctl) = control(false);
        ctl.apply_persisted("warning").unwrap();
        assert!(current(&ctl).contains("warn"));
    }
}
