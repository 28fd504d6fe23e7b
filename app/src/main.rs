use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};

use crate::bridge::Bridge;
use crate::dimmer::LevelController;
use crate::exit::Termination;
use crate::settings::Settings;

mod adapter;
mod bridge;
mod dimmer;
mod exit;
mod settings;
mod x10;

#[derive(Parser)]
#[command(name = "x10-dimmer-bridge")]
#[command(about = "Turns X10 Dim/Bright packets into Domoticz dimmer levels")]
struct Cli {
    /// Settings file, TOML or JSON
    #[arg(long, env = "X10BRIDGE_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let termination = run(cli).await;

    tracing::info!("Exiting: {} (code {})", termination, termination.code());
    termination.into()
}

async fn run(cli: Cli) -> Termination {
    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            let _ = infrastructure::MonitoringConfig::default().init();
            tracing::error!("Error reading configuration {}: {}", cli.config.display(), e);
            return Termination::Configuration;
        }
    };

    if let Err(e) = settings.monitoring.init() {
        let _ = infrastructure::MonitoringConfig::default().init();
        tracing::error!("Error initializing monitoring: {:#}", e);
        return Termination::Configuration;
    }

    let api = match settings.domoticz.new_device_api() {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("Error initializing Domoticz client: {:#}", e);
            return Termination::Unexpected;
        }
    };

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::error!("Error installing SIGTERM handler: {}", e);
            return Termination::Unexpected;
        }
    };

    let controller = LevelController::new(api, settings.devices);
    let mut bridge = Bridge::new(settings.house_code, settings.delta, controller);

    tracing::info!(
        "Monitoring house {} with delta {} via {}",
        settings.house_code,
        settings.delta,
        settings.domoticz.base_url()
    );

    let relay = settings.relay;
    let process = async {
        match relay.connect().await {
            Ok(mut connection) => bridge.run(&mut connection).await,
            Err(e) => e,
        }
    };

    tokio::select! {
        e = process => {
            tracing::error!("{}", e);
            Termination::ConnectionLost
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down");
            Termination::Interrupted
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down");
            Termination::Interrupted
        }
    }
}
