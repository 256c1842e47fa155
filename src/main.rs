use anyhow::Result;
use clap::Parser;
use frigate_relay::api::RestApi;
use frigate_relay::config::{self, Config, StoreBackend};
use frigate_relay::frigate::FrigateClient;
use frigate_relay::messaging::{CommandBot, Messenger, SendOptions, SharedMessenger, TelegramClient};
use frigate_relay::notifier::Notifier;
use frigate_relay::services::{fatal_channel, PrimaryPoller, WatchdogPoller};
use frigate_relay::store::{ControlFlags, MemoryStore, RedisStore, SharedStore};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Forward NVR detection events to a Telegram chat
#[derive(Debug, Parser)]
#[command(name = "frigate-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, env = "FRIGATE_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(&config.api.log_level),
    };
    builder.init();
}

async fn build_store(config: &Config) -> Result<SharedStore> {
    match config.store.backend {
        StoreBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.store).await?)),
        StoreBackend::Memory => {
            warn!("Using the in-memory state store; delivery state is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn run_app(config: Config) -> Result<()> {
    let store = build_store(&config).await?;
    let flags = ControlFlags::new(store.clone());

    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);
    let me = telegram.get_me().await?;
    info!(
        "Authorized on account {}",
        me.username.as_deref().unwrap_or("unknown")
    );
    let messenger: SharedMessenger = telegram.clone();

    if let Err(e) = messenger
        .send_text("Frigate relay started", SendOptions::default())
        .await
    {
        warn!("Failed to send startup message: {}", e);
    }

    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let frigate = FrigateClient::new(&config.frigate)?;
    let notifier = Arc::new(Notifier::new(messenger.clone(), store.clone(), &config));

    let primary = Arc::new(PrimaryPoller::new(
        &config,
        frigate.clone(),
        store.clone(),
        notifier.clone(),
        fatal_tx.clone(),
    ));
    primary.start().await?;
    info!("Event poller started");

    if config.watchdog.enabled {
        let watchdog = Arc::new(WatchdogPoller::new(
            &config,
            frigate,
            store.clone(),
            notifier.clone(),
            fatal_tx.clone(),
        ));
        watchdog.start().await?;
        info!("Watchdog started");
    }

    if config.telegram.commands_enabled {
        let bot = Arc::new(CommandBot::new(
            telegram.clone(),
            flags.clone(),
            config.telegram.updates_timeout_secs,
        ));
        bot.start().await?;
        info!("Chat command listener started");
    }

    if config.api.enabled {
        let api = RestApi::new(&config.api, flags);
        let api_fatal = fatal_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = api.run().await {
                error!("API server stopped: {}", e);
                let _ = api_fatal.send(e);
            }
        });
        info!("API server started");
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down...");
            Ok(())
        }
        Some(e) = fatal_rx.recv() => {
            error!("Fatal error, shutting down: {}", e);
            notifier.report_error(&format!("Fatal error, shutting down: {}", e)).await;
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    config::apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    init_logging(&config);

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    if cli.check_config {
        info!("Configuration is valid");
        return ExitCode::SUCCESS;
    }

    info!("Starting Frigate relay {}", env!("CARGO_PKG_VERSION"));
    match run_app(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
