//! Upstream data sources and their raw payload shapes

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::RatesFetchError;

/// One entry of the BFF rates response. Bid and ask arrive as numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRate {
    pub code: String,
    #[serde(default, alias = "name")]
    pub currency: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub bid: Option<Value>,
    #[serde(default)]
    pub ask: Option<Value>,
}

/// Body of the global market endpoint. Only `data` is kept and its fields are
/// read leniently during normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMarketStats {
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RawMarketStats {
    /// The `{ data: {} }` sentinel returned whenever market stats are unavailable.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads `data.<section>.<key>` as a number.
    pub fn number(&self, section: &str, key: &str) -> Option<f64> {
        self.data.get(section)?.get(key)?.as_f64()
    }
}

#[async_trait]
pub trait RatesProvider: Send + Sync {
    async fn fetch_rates(&self) -> Result<Vec<RawRate>, RatesFetchError>;
}

/// Best-effort source. Implementations never fail; they return
/// [`RawMarketStats::empty`] instead.
#[async_trait]
pub trait MarketStatsProvider: Send + Sync {
    async fn fetch_market_stats(&self) -> RawMarketStats;
}
