//! Clap derive structures for the `lvibridge` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-level CLI ────────────────────────────────────────────────────

/// lvibridge: LVI and Mill heaters on a FIMP MQTT bus
#[derive(Debug, Parser)]
#[command(
    name = "lvibridge",
    version,
    about = "Bridge LVI and Mill cloud heaters onto a FIMP MQTT bus",
    long_about = "Bridge LVI and Mill cloud heaters onto a FIMP MQTT bus.\n\n\
        Logs in to the vendor cloud, exposes each heater as a thermostat and\n\
        temperature sensor, and answers adapter commands on the bus.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "LVIBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the broker and serve adapter commands until interrupted
    Run,

    /// Inspect the configuration
    Config(ConfigArgs),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration with secrets masked
    Show,
}
