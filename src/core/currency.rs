//! Display records held by the refresh store

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog;

/// A fiat currency quoted against PLN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyRecord {
    pub code: String,
    pub name: String,
    pub flag: String,
    pub rate: f64,
    pub change: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CryptoRecord {
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub icon: String,
    pub rate: f64,
    pub change: f64,
}

impl CryptoRecord {
    /// Builds a record using the local catalog for display metadata.
    pub fn from_catalog(code: &str, rate: f64, change: f64) -> Self {
        let info = catalog::crypto_info(code);
        CryptoRecord {
            code: code.to_string(),
            name: info.map_or_else(|| code.to_string(), |i| i.name.to_string()),
            symbol: info.map_or_else(|| code.to_string(), |i| i.symbol.to_string()),
            icon: info.map_or(catalog::DEFAULT_CRYPTO_ICON, |i| i.icon).to_string(),
            rate,
            change,
        }
    }
}

/// Global crypto market figures converted to PLN.
///
/// Every numeric field is independently optional and keeps its last known value
/// when a refresh could not compute it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketStats {
    pub market_cap_pln: Option<f64>,
    pub volume_24h_pln: Option<f64>,
    pub btc_dominance: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}
