//! Core types and abstractions

pub mod catalog;
pub mod config;
pub mod currency;
pub mod error;
pub mod format;
pub mod log;
pub mod source;

// Re-export main types for cleaner imports
pub use currency::{CryptoRecord, CurrencyRecord, MarketStats};
pub use error::RatesFetchError;
pub use source::{MarketStatsProvider, RatesProvider, RawMarketStats, RawRate};
