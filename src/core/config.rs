use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BffProviderConfig {
    pub base_url: String,
    #[serde(default = "default_bff_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarketProviderConfig {
    pub base_url: String,
    #[serde(default = "default_market_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_bff_timeout_ms() -> u64 {
    10_000
}

fn default_market_timeout_ms() -> u64 {
    15_000
}

fn default_interval_ms() -> u64 {
    300_000
}

impl Default for BffProviderConfig {
    fn default() -> Self {
        BffProviderConfig {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: default_bff_timeout_ms(),
        }
    }
}

impl Default for MarketProviderConfig {
    fn default() -> Self {
        MarketProviderConfig {
            base_url: "https://api.coingecko.com".to_string(),
            timeout_ms: default_market_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub bff: BffProviderConfig,
    #[serde(default)]
    pub market: MarketProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_ms")]
    pub rates_interval_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub market_stats_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            rates_interval_ms: default_interval_ms(),
            market_stats_interval_ms: default_interval_ms(),
        }
    }
}

impl RefreshConfig {
    pub fn rates_interval(&self) -> Duration {
        Duration::from_millis(self.rates_interval_ms)
    }

    pub fn market_stats_interval(&self) -> Duration {
        Duration::from_millis(self.market_stats_interval_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been created there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("pl", "kantor", "kantor")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Rejects zero timeouts and intervals. A zero interval would turn the
    /// refresh chain into a tight request loop.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("providers.bff.timeout_ms", self.providers.bff.timeout_ms),
            ("providers.market.timeout_ms", self.providers.market.timeout_ms),
            ("refresh.rates_interval_ms", self.refresh.rates_interval_ms),
            (
                "refresh.market_stats_interval_ms",
                self.refresh.market_stats_interval_ms,
            ),
        ];
        for (key, value) in positive {
            ensure!(value > 0, "{key} must be greater than 0");
        }
        Ok(())
    }
}
