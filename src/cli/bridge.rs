use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fillerup_bridge::logging::{LogConfig, RotationPeriod, setup_logging};
use fillerup_bridge::page::{CommandPage, LogPage, SettingsPage, settings_url};
use fillerup_bridge::protocol::{DeviceObserverRef, MqttMessenger};
use fillerup_bridge::store::{JsonFileStorage, Preference, SettingsStore};
use fillerup_bridge::web::start_web_server;
use fillerup_bridge::{BridgeConfig, EventForwarder, SyncController};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Subcommand, Debug, Default, Clone)]
enum Commands {
    /// Connect to the watch face and serve settings page callbacks
    #[default]
    Run,
    /// Print the settings page URL built from the stored values
    Url,
    /// Print every stored preference
    Dump,
    /// Write a preference directly
    Set { key: Preference, value: i32 },
}

#[derive(Parser, Debug)]
struct Params {
    /// Configuration file (JSON); defaults are used when not set
    #[clap(long, env = "FILLERUP_CONFIG")]
    config: Option<PathBuf>,
    /// Preference storage file, overrides the configuration
    #[clap(long)]
    storage: Option<String>,
    /// MQTT broker host, overrides the configuration
    #[clap(long)]
    host: Option<String>,
    /// MQTT broker port, overrides the configuration
    #[clap(long)]
    port: Option<u16>,
    /// Device id used in the MQTT topics, overrides the configuration
    #[clap(long)]
    device: Option<String>,
    /// Directory for rolling log files (if not set, logs to stdout)
    #[clap(long)]
    log_dir: Option<String>,
    /// Log rotation period: minutely, hourly, daily or never
    #[clap(long, default_value = "daily")]
    log_rotation: RotationPeriod,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let params = Params::parse();

    let _log_guard = setup_logging(&LogConfig {
        log_dir: params.log_dir.clone(),
        rotation: params.log_rotation,
        ..LogConfig::default()
    })
    .context("Failed to set up logging")?;

    let config = load_config(&params)?;
    let store = SettingsStore::new(JsonFileStorage::open(&config.storage_path));

    match params.command.clone().unwrap_or_default() {
        Commands::Run => run(config, store).await?,
        Commands::Url => {
            let options = config.sync_options()?;
            let url = settings_url(
                &options.settings_page,
                &store,
                options.variant,
                options.return_to.as_deref(),
            );
            println!("{url}");
        }
        Commands::Dump => {
            for line in store.describe() {
                println!("{line}");
            }
        }
        Commands::Set { key, value } => {
            if !key.accepts(value) {
                bail!("{key} must be within {:?}", key.domain());
            }
            store.set(key, value);
            println!("{key}={}", store.get(key));
        }
    }

    Ok(())
}

fn load_config(params: &Params) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::load(params.config.as_deref())?;
    if let Some(storage) = &params.storage {
        config.storage_path = storage.clone();
    }
    if let Some(host) = &params.host {
        config.mqtt.host = host.clone();
    }
    if let Some(port) = params.port {
        config.mqtt.port = port;
    }
    if let Some(device) = &params.device {
        config.mqtt.device_id = device.clone();
    }
    Ok(config)
}

async fn run(config: BridgeConfig, store: SettingsStore<JsonFileStorage>) -> Result<()> {
    let options = config.sync_options()?;
    let page: Box<dyn SettingsPage> = match &config.open_command {
        Some(command) => Box::new(CommandPage::new(command)?),
        None => Box::new(LogPage),
    };

    let (sender, receiver) = mpsc::channel(32);
    let observer: DeviceObserverRef = Arc::new(EventForwarder::new(sender.clone()));
    let messenger = Arc::new(
        MqttMessenger::connect(config.device_link_options()?, Some(observer))
            .await
            .context("Failed to start device link")?,
    );

    if let Some(addr) = start_web_server(&config.web, sender.clone())
        .await
        .context("Failed to start callback server")?
    {
        info!("Start a configuration round with http://{}/configure", addr);
    }
    drop(sender);

    info!(
        "Bridging {} watch face, preferences in {}",
        options.variant.as_str(),
        config.storage_path
    );
    let controller = SyncController::new(store, messenger.clone(), page, options);
    let controller_task = tokio::spawn(controller.run(receiver));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    if let Err(e) = messenger.disconnect().await {
        error!("Failed to close device link: {}", e);
    }
    controller_task.abort();
    Ok(())
}
