//! Local display metadata used when upstream omits it.

/// Shown for currencies that have no known flag.
pub const DEFAULT_FLAG: &str = "💱";

pub const DEFAULT_CRYPTO_ICON: &str = "mdi-currency-btc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub flag: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub icon: &'static str,
}

pub const CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo { code: "USD", flag: "🇺🇸", name: "Dolar amerykański" },
    CurrencyInfo { code: "EUR", flag: "🇪🇺", name: "Euro" },
    CurrencyInfo { code: "GBP", flag: "🇬🇧", name: "Funt brytyjski" },
    CurrencyInfo { code: "CHF", flag: "🇨🇭", name: "Frank szwajcarski" },
    CurrencyInfo { code: "JPY", flag: "🇯🇵", name: "Jen japoński" },
    CurrencyInfo { code: "CAD", flag: "🇨🇦", name: "Dolar kanadyjski" },
    CurrencyInfo { code: "AUD", flag: "🇦🇺", name: "Dolar australijski" },
    CurrencyInfo { code: "CNY", flag: "🇨🇳", name: "Juan chiński" },
    CurrencyInfo { code: "SEK", flag: "🇸🇪", name: "Korona szwedzka" },
    CurrencyInfo { code: "NOK", flag: "🇳🇴", name: "Korona norweska" },
];

// Not fed by the BFF yet; kept for when crypto codes show up in the rates stream.
pub const CRYPTOCURRENCIES: &[CryptoInfo] = &[
    CryptoInfo { code: "BTC", name: "Bitcoin", symbol: "₿", icon: "mdi-bitcoin" },
    CryptoInfo { code: "ETH", name: "Ethereum", symbol: "Ξ", icon: "mdi-ethereum" },
    CryptoInfo { code: "USDT", name: "Tether", symbol: "₮", icon: "mdi-currency-usd" },
    CryptoInfo { code: "BNB", name: "Binance Coin", symbol: "BNB", icon: "mdi-hexagon-multiple" },
    CryptoInfo { code: "SOL", name: "Solana", symbol: "SOL", icon: "mdi-triangle" },
    CryptoInfo { code: "XRP", name: "Ripple", symbol: "XRP", icon: "mdi-water" },
    CryptoInfo { code: "ADA", name: "Cardano", symbol: "₳", icon: "mdi-alpha-a-circle" },
    CryptoInfo { code: "DOGE", name: "Dogecoin", symbol: "Ð", icon: "mdi-dog" },
    CryptoInfo { code: "DOT", name: "Polkadot", symbol: "DOT", icon: "mdi-circle-multiple" },
    CryptoInfo { code: "MATIC", name: "Polygon", symbol: "MATIC", icon: "mdi-hexagon" },
];

pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES.iter().find(|c| c.code == code)
}

pub fn crypto_info(code: &str) -> Option<&'static CryptoInfo> {
    CRYPTOCURRENCIES.iter().find(|c| c.code == code)
}

/// Flag emoji for `code`, or [`DEFAULT_FLAG`].
pub fn currency_flag(code: &str) -> &'static str {
    currency_info(code).map_or(DEFAULT_FLAG, |c| c.flag)
}

/// Display name for `code`, or the code itself.
pub fn currency_name(code: &str) -> String {
    currency_info(code).map_or_else(|| code.to_string(), |c| c.name.to_string())
}
