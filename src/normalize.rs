//! Maps upstream payloads onto display records.
//!
//! Rates: names and flags fall back to the local catalog, then to the code
//! itself or [`catalog::DEFAULT_FLAG`]. Numeric fields use float-prefix parsing
//! (`"4.02 PLN"` reads as `4.02`); anything unparsable becomes `NaN` and is kept
//! so the bad value shows up on screen instead of turning into a plausible zero.
//!
//! Market stats: each figure is extracted independently and only the ones that
//! could be computed are written back, see [`MarketStatsUpdate::apply`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

use crate::core::{CryptoRecord, CurrencyRecord, MarketStats, RawMarketStats, RawRate, catalog};

/// Maps every upstream item to one record, in upstream order. Repeated codes
/// are kept as-is and only logged.
pub fn normalize_rates(raw: &[RawRate]) -> (Vec<CurrencyRecord>, Vec<CryptoRecord>) {
    let mut seen = HashSet::new();
    for item in raw {
        if !seen.insert(item.code.as_str()) {
            warn!(code = %item.code, "Duplicate currency code in rates response");
        }
    }
    let currencies = raw.iter().map(normalize_rate).collect();

    // The BFF has no crypto feed.
    (currencies, Vec::new())
}

fn normalize_rate(item: &RawRate) -> CurrencyRecord {
    let name = non_empty(item.currency.as_deref())
        .map_or_else(|| catalog::currency_name(&item.code), str::to_string);
    let flag = non_empty(item.flag.as_deref())
        .unwrap_or_else(|| catalog::currency_flag(&item.code))
        .to_string();

    let bid = optional_number(item.bid.as_ref());
    let ask = optional_number(item.ask.as_ref());
    let rate = ask.unwrap_or(f64::NAN);
    if rate.is_nan() {
        warn!(code = %item.code, ask = ?item.ask, "Unparsable ask price, rate is NaN");
    }

    CurrencyRecord {
        code: item.code.clone(),
        name,
        flag,
        rate,
        change: 0.0,
        bid,
        ask,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn optional_number(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_number(v)),
    }
}

fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_float(s),
        _ => f64::NAN,
    }
}

/// Parses the longest numeric prefix of `text`, ignoring leading whitespace.
/// Returns `NaN` when there is none.
pub fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Market figures computed in one refresh cycle. `None` means "keep what the
/// store already has".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketStatsUpdate {
    pub market_cap_pln: Option<f64>,
    pub volume_24h_pln: Option<f64>,
    pub btc_dominance: Option<f64>,
    /// Upstream delivered a payload, even if no figure could be computed from it.
    pub attempted: bool,
}

impl MarketStatsUpdate {
    /// Names of the figures this update leaves untouched.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("market_cap_pln", self.market_cap_pln),
            ("volume_24h_pln", self.volume_24h_pln),
            ("btc_dominance", self.btc_dominance),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.is_none().then_some(name))
        .collect()
    }

    /// Overwrites only the computed fields; `updated_at` moves whenever the
    /// update was attempted.
    pub fn apply(&self, stats: &mut MarketStats, now: DateTime<Utc>) {
        if let Some(v) = self.market_cap_pln {
            stats.market_cap_pln = Some(v);
        }
        if let Some(v) = self.volume_24h_pln {
            stats.volume_24h_pln = Some(v);
        }
        if let Some(v) = self.btc_dominance {
            stats.btc_dominance = Some(v);
        }
        if self.attempted {
            stats.updated_at = Some(now);
        }
    }
}

/// Extracts market figures and converts USD amounts to PLN with `usd_rate`.
/// Without a usable USD rate the PLN figures stay unset for this cycle.
pub fn normalize_market_stats(raw: &RawMarketStats, usd_rate: Option<f64>) -> MarketStatsUpdate {
    if raw.is_empty() {
        return MarketStatsUpdate::default();
    }

    let usd_rate = usd_rate.filter(|r| r.is_finite());
    let to_pln = |usd: Option<f64>| usd.zip(usd_rate).map(|(amount, rate)| amount * rate);

    MarketStatsUpdate {
        market_cap_pln: to_pln(raw.number("total_market_cap", "usd")),
        volume_24h_pln: to_pln(raw.number("total_volume", "usd")),
        btc_dominance: raw.number("market_cap_percentage", "btc"),
        attempted: true,
    }
}
