pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod driver;
pub mod models;
pub mod parser;
pub mod services;

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, cmd_list_shows, cmd_show_info, cmd_sync};
pub use config::Config;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    let default_catalog = PathBuf::from(&config.general.catalog_path);
    let catalog_path = |custom: Option<PathBuf>| custom.unwrap_or_else(|| default_catalog.clone());

    match cli.command {
        None => {
            let catalog = catalog_path(None);
            cmd_sync(&config, &catalog, None).await
        }

        Some(Commands::Sync {
            budget,
            max_shows,
            catalog,
        }) => {
            let catalog = catalog_path(catalog);
            if let Some(max_shows) = max_shows {
                config.site.max_shows = max_shows;
            }
            if budget == Some(0) {
                anyhow::bail!("--budget must be > 0");
            }
            cmd_sync(&config, &catalog, budget).await
        }

        Some(Commands::List { catalog }) => cmd_list_shows(&catalog_path(catalog)).await,

        Some(Commands::Info { id, catalog }) => cmd_show_info(&catalog_path(catalog), &id).await,

        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, left unchanged.");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "streamdex starting");
}
