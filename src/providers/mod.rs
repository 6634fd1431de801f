pub mod bff;
pub mod coingecko;
pub mod http;

pub use bff::BffRatesProvider;
pub use coingecko::CoinGeckoProvider;
