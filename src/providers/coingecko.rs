use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::http::ApiClient;
use crate::core::{MarketStatsProvider, RawMarketStats};

pub const GLOBAL_STATS_PATH: &str = "/api/v3/global";

/// Why a market stats request produced nothing. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatsFailure {
    Timeout,
    Network,
    RateLimited,
    HttpStatus(u16),
    IncompleteData,
}

impl Display for MarketStatsFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketStatsFailure::Timeout => write!(f, "timeout"),
            MarketStatsFailure::Network => write!(f, "network error"),
            MarketStatsFailure::RateLimited => write!(f, "rate limit exceeded"),
            MarketStatsFailure::HttpStatus(status) => write!(f, "HTTP status {status}"),
            MarketStatsFailure::IncompleteData => write!(f, "incomplete data structure"),
        }
    }
}

impl From<reqwest::Error> for MarketStatsFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MarketStatsFailure::Timeout
        } else if e.is_decode() {
            MarketStatsFailure::IncompleteData
        } else {
            MarketStatsFailure::Network
        }
    }
}

/// Global crypto market statistics from CoinGecko. Best-effort: every failure
/// degrades to [`RawMarketStats::empty`].
pub struct CoinGeckoProvider {
    api: ApiClient,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(CoinGeckoProvider {
            api: ApiClient::new("External API", base_url, timeout)?,
        })
    }

    async fn request_stats(&self) -> Result<RawMarketStats, MarketStatsFailure> {
        let response = self.api.get(GLOBAL_STATS_PATH).await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketStatsFailure::RateLimited);
        }
        if !status.is_success() {
            return Err(MarketStatsFailure::HttpStatus(status.as_u16()));
        }

        let body: Value = response.json().await?;
        match body.get("data").and_then(Value::as_object) {
            Some(data) => Ok(RawMarketStats { data: data.clone() }),
            None => Err(MarketStatsFailure::IncompleteData),
        }
    }
}

#[async_trait]
impl MarketStatsProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoGlobalFetch", skip(self))]
    async fn fetch_market_stats(&self) -> RawMarketStats {
        match self.request_stats().await {
            Ok(stats) => {
                debug!(fields = stats.data.len(), "Fetched market stats");
                stats
            }
            Err(failure) => {
                match failure {
                    MarketStatsFailure::IncompleteData => {
                        warn!("CoinGecko API returned incomplete data structure")
                    }
                    MarketStatsFailure::HttpStatus(_) => {
                        error!(%failure, "Error fetching market stats")
                    }
                    _ => warn!(
                        "CoinGecko API {} - continuing without market stats",
                        failure
                    ),
                }
                RawMarketStats::empty()
            }
        }
    }
}
