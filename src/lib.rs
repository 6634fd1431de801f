pub mod cli;
pub mod core;
pub mod normalize;
pub mod providers;
pub mod scheduler;
pub mod store;

use crate::core::config::AppConfig;
use crate::providers::{BffRatesProvider, CoinGeckoProvider};
use crate::store::RefreshStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Rates,
    Watch,
}

/// Wires the HTTP providers into the one store shared by all consumers.
pub fn build_store(config: &AppConfig) -> Result<Arc<RefreshStore>> {
    config.validate()?;
    let bff = &config.providers.bff;
    let market = &config.providers.market;

    let rates_provider =
        BffRatesProvider::new(&bff.base_url, Duration::from_millis(bff.timeout_ms))?;
    let market_provider =
        CoinGeckoProvider::new(&market.base_url, Duration::from_millis(market.timeout_ms))?;

    Ok(Arc::new(RefreshStore::new(
        Arc::new(rates_provider),
        Arc::new(market_provider),
    )))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Kantor starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = build_store(&config)?;
    match command {
        AppCommand::Rates => cli::board::show(&store).await,
        AppCommand::Watch => cli::board::watch(store, &config.refresh).await,
    }
}
