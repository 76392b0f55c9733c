mod cli;
mod error;
mod logging;
mod mqtt;

use std::path::Path;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lvibridge_api::{LviClient, TransportConfig};
use lvibridge_config::{TomlStateStore, config_path, load_config};
use lvibridge_core::{BusEvent, Router, RouterConfig, process_inbound};

use crate::cli::{Cli, Command, ConfigCommand, GlobalOpts};
use crate::error::BridgeError;
use crate::mqtt::MqttBus;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), BridgeError> {
    match cli.command {
        // Config commands never touch the broker or the vendor API
        Command::Config(args) => config_cmd(&args.command, cli.global.config.as_deref()),
        Command::Run => serve(&cli.global).await,
    }
}

fn config_cmd(command: &ConfigCommand, path: Option<&Path>) -> Result<(), BridgeError> {
    match command {
        ConfigCommand::Path => {
            let path = path.map_or_else(config_path, Path::to_path_buf);
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let config = load_config(path)?;
            print!("{}", config.to_redacted_toml()?);
        }
    }
    Ok(())
}

async fn serve(global: &GlobalOpts) -> Result<(), BridgeError> {
    let config = load_config(global.config.as_deref())?;
    let log_control = logging::init_tracing(global.verbose, &config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "starting lvibridge");

    let transport = TransportConfig::default().with_timeout(config.vendor.timeout());
    let vendor = LviClient::new(config.vendor.base_url()?, &transport)?;
    let (bus, eventloop) = MqttBus::connect(&config.mqtt);

    let router_config = RouterConfig {
        service_name: config.adapter.service_name.clone(),
        manifest_path: config.adapter.manifest_path(),
    };
    let mut router = Router::new(router_config, vendor, bus.clone())
        .with_state_store(TomlStateStore::new(config.adapter.state_path()))
        .with_log_control(log_control);
    router.restore()?;

    let (tx, rx) = mpsc::channel::<BusEvent>(config.adapter.queue_capacity);
    let cancel = CancellationToken::new();

    let pump = tokio::spawn(mqtt::pump_events(
        eventloop,
        bus.client(),
        router.subscriptions(),
        tx,
        cancel.clone(),
    ));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    process_inbound(&mut router, rx, cancel.clone()).await;
    cancel.cancel();
    if let Err(e) = pump.await {
        warn!(error = %e, "broker task ended abnormally");
    }
    bus.disconnect().await;
    info!("stopped");
    Ok(())
}
