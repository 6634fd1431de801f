//! Shared refresh store.
//!
//! One [`RefreshStore`] is built at startup and handed out as
//! `Arc<RefreshStore>`. It owns the current currency snapshot, the crypto
//! snapshot, the merged market stats and the loading/error flags. Refresh
//! cycles are the only writers; everything else reads.
//!
//! Each data class has an in-flight guard, so a manual refresh can never
//! overlap an automatic one. The guard also owns the `loading` flag and clears
//! it on drop, which covers success, failure and a cancelled future alike.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::core::{CryptoRecord, CurrencyRecord, MarketStats, MarketStatsProvider, RatesProvider};
use crate::normalize::{MarketStatsUpdate, normalize_market_stats, normalize_rates};

/// Currency whose rate converts USD market figures to PLN.
pub const REFERENCE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    /// Nothing to do, or upstream had nothing to offer.
    Unchanged,
    /// The error is stored and readable through [`RefreshStore::error`].
    Failed,
    AlreadyInFlight,
}

/// Point-in-time copy of everything consumers can read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub currencies: Vec<CurrencyRecord>,
    pub cryptocurrencies: Vec<CryptoRecord>,
    pub market_stats: MarketStats,
    pub loading: bool,
    pub error: Option<String>,
}

impl StoreSnapshot {
    pub fn has_data(&self) -> bool {
        !self.currencies.is_empty() || !self.cryptocurrencies.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    currencies: Vec<CurrencyRecord>,
    cryptocurrencies: Vec<CryptoRecord>,
    market_stats: MarketStats,
    error: Option<String>,
}

struct InFlight<'a> {
    flag: &'a AtomicBool,
    revision: &'a watch::Sender<u64>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, revision: &'a watch::Sender<u64>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlight { flag, revision })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.revision.send_modify(|r| *r += 1);
    }
}

pub struct RefreshStore {
    rates: Arc<dyn RatesProvider>,
    market: Arc<dyn MarketStatsProvider>,
    state: RwLock<StoreState>,
    rates_in_flight: AtomicBool,
    stats_in_flight: AtomicBool,
    revision: watch::Sender<u64>,
}

impl RefreshStore {
    pub fn new(rates: Arc<dyn RatesProvider>, market: Arc<dyn MarketStatsProvider>) -> Self {
        let (revision, _) = watch::channel(0);
        RefreshStore {
            rates,
            market,
            state: RwLock::new(StoreState::default()),
            rates_in_flight: AtomicBool::new(false),
            stats_in_flight: AtomicBool::new(false),
            revision,
        }
    }

    /// Fetches rates once unless data is already present or a fetch is running.
    /// Safe to call from every consumer.
    pub async fn init(&self) -> RefreshOutcome {
        // Guard first, so concurrent callers cannot both pass the emptiness check.
        let Some(guard) = InFlight::acquire(&self.rates_in_flight, &self.revision) else {
            debug!("Rates fetch already in flight, init skipped");
            return RefreshOutcome::AlreadyInFlight;
        };
        if self.has_data().await {
            debug!("Store already populated, init skipped");
            return RefreshOutcome::Unchanged;
        }
        self.run_rates_cycle(guard).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_exchange_rates(&self) -> RefreshOutcome {
        let Some(guard) = InFlight::acquire(&self.rates_in_flight, &self.revision) else {
            debug!("Rates fetch already in flight, skipping");
            return RefreshOutcome::AlreadyInFlight;
        };
        self.run_rates_cycle(guard).await
    }

    async fn run_rates_cycle(&self, guard: InFlight<'_>) -> RefreshOutcome {
        self.state.write().await.error = None;
        self.revision.send_modify(|r| *r += 1);

        let outcome = match self.rates.fetch_rates().await {
            Ok(raw) => {
                let (currencies, cryptocurrencies) = normalize_rates(&raw);
                info!(
                    currencies = currencies.len(),
                    cryptocurrencies = cryptocurrencies.len(),
                    "Exchange rates refreshed"
                );
                let mut state = self.state.write().await;
                state.currencies = currencies;
                state.cryptocurrencies = cryptocurrencies;
                RefreshOutcome::Updated
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh exchange rates, keeping previous snapshot");
                self.state.write().await.error = Some(e.to_string());
                RefreshOutcome::Failed
            }
        };

        drop(guard);
        outcome
    }

    #[instrument(skip(self))]
    pub async fn fetch_market_stats(&self) -> RefreshOutcome {
        let Some(_guard) = InFlight::acquire(&self.stats_in_flight, &self.revision) else {
            debug!("Market stats fetch already in flight, skipping");
            return RefreshOutcome::AlreadyInFlight;
        };

        let raw = self.market.fetch_market_stats().await;
        if raw.is_empty() {
            for field in MarketStatsUpdate::default().missing_fields() {
                info!(field, "Market stats unavailable, keeping previous value");
            }
            return RefreshOutcome::Unchanged;
        }

        let mut state = self.state.write().await;
        let usd_rate = state
            .currencies
            .iter()
            .find(|c| c.code == REFERENCE_CURRENCY)
            .map(|c| c.rate);
        if usd_rate.is_none() {
            debug!("No {} rate yet, PLN market figures not converted", REFERENCE_CURRENCY);
        }

        let update = normalize_market_stats(&raw, usd_rate);
        for field in update.missing_fields() {
            warn!(field, "Market stat not computed this cycle, keeping previous value");
        }
        update.apply(&mut state.market_stats, Utc::now());
        debug!(stats = ?state.market_stats, "Market stats merged");
        RefreshOutcome::Updated
    }

    pub async fn currencies(&self) -> Vec<CurrencyRecord> {
        self.state.read().await.currencies.clone()
    }

    pub async fn cryptocurrencies(&self) -> Vec<CryptoRecord> {
        self.state.read().await.cryptocurrencies.clone()
    }

    pub async fn market_stats(&self) -> MarketStats {
        self.state.read().await.market_stats.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn has_data(&self) -> bool {
        let state = self.state.read().await;
        !state.currencies.is_empty() || !state.cryptocurrencies.is_empty()
    }

    /// True while a rates fetch is running.
    pub fn loading(&self) -> bool {
        self.rates_in_flight.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            currencies: state.currencies.clone(),
            cryptocurrencies: state.cryptocurrencies.clone(),
            market_stats: state.market_stats.clone(),
            loading: self.loading(),
            error: state.error.clone(),
        }
    }

    /// Revision counter that changes whenever the store may have changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::{RatesFetchError, RawMarketStats, RawRate};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    pub(crate) struct MockRates {
        pub calls: AtomicUsize,
        responses: Mutex<VecDeque<Result<Vec<RawRate>, RatesFetchError>>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockRates {
        pub fn new(responses: Vec<Result<Vec<RawRate>, RatesFetchError>>) -> Self {
            MockRates {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RatesProvider for MockRates {
        async fn fetch_rates(&self) -> Result<Vec<RawRate>, RatesFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    pub(crate) struct MockMarket {
        responses: Mutex<VecDeque<RawMarketStats>>,
    }

    impl MockMarket {
        pub fn new(responses: Vec<RawMarketStats>) -> Self {
            MockMarket {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl MarketStatsProvider for MockMarket {
        async fn fetch_market_stats(&self) -> RawMarketStats {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(RawMarketStats::empty)
        }
    }

    pub(crate) fn rate(code: &str, ask: &str) -> RawRate {
        RawRate {
            code: code.to_string(),
            currency: None,
            flag: None,
            bid: Some(json!(ask)),
            ask: Some(json!(ask)),
        }
    }

    fn stats(value: serde_json::Value) -> RawMarketStats {
        serde_json::from_value(value).unwrap()
    }

    fn store_with(rates: Arc<MockRates>, market: MockMarket) -> Arc<RefreshStore> {
        Arc::new(RefreshStore::new(rates, Arc::new(market)))
    }

    #[tokio::test]
    async fn test_successful_fetch_replaces_snapshot() {
        let rates = Arc::new(MockRates::new(vec![
            Ok(vec![rate("USD", "4.02"), rate("EUR", "4.32"), rate("GBP", "5.08")]),
            Ok(vec![rate("CHF", "4.61")]),
        ]));
        let store = store_with(rates.clone(), MockMarket::default());

        assert_eq!(store.fetch_exchange_rates().await, RefreshOutcome::Updated);
        assert_eq!(store.currencies().await.len(), 3);
        assert!(store.cryptocurrencies().await.is_empty());
        assert!(store.has_data().await);

        assert_eq!(store.fetch_exchange_rates().await, RefreshOutcome::Updated);
        let currencies = store.currencies().await;
        assert_eq!(currencies.len(), 1);
        assert_eq!(currencies[0].code, "CHF");
    }

    #[tokio::test]
    async fn test_empty_response_empties_snapshot() {
        let rates = Arc::new(MockRates::new(vec![Ok(vec![rate("USD", "4.02")]), Ok(vec![])]));
        let store = store_with(rates, MockMarket::default());

        store.fetch_exchange_rates().await;
        assert!(store.has_data().await);
        store.fetch_exchange_rates().await;
        assert!(!store.has_data().await);
    }

    #[tokio::test]
    async fn test_failure_keeps_existing_snapshot() {
        let rates = Arc::new(MockRates::new(vec![
            Ok(vec![rate("USD", "4.02")]),
            Err(RatesFetchError::Transport("connection reset".to_string())),
        ]));
        let store = store_with(rates, MockMarket::default());

        store.fetch_exchange_rates().await;
        assert_eq!(store.fetch_exchange_rates().await, RefreshOutcome::Failed);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.currencies.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some("connection reset"));
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_failure_on_empty_store_stays_empty() {
        let rates = Arc::new(MockRates::new(vec![Err(RatesFetchError::Upstream {
            status: 503,
            message: "Serwis niedostępny".to_string(),
        })]));
        let store = store_with(rates, MockMarket::default());

        assert_eq!(store.fetch_exchange_rates().await, RefreshOutcome::Failed);
        assert!(store.currencies().await.is_empty());
        assert!(store.cryptocurrencies().await.is_empty());
        assert_eq!(store.error().await.as_deref(), Some("Serwis niedostępny"));
    }

    #[tokio::test]
    async fn test_error_cleared_on_next_fetch() {
        let rates = Arc::new(MockRates::new(vec![
            Err(RatesFetchError::Transport("down".to_string())),
            Ok(vec![rate("USD", "4.02")]),
        ]));
        let store = store_with(rates, MockMarket::default());

        store.fetch_exchange_rates().await;
        assert!(store.error().await.is_some());
        store.fetch_exchange_rates().await;
        assert!(store.error().await.is_none());
    }

    async fn wait_for_calls(rates: &MockRates, n: usize) {
        while rates.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_loading_flag_around_fetch() {
        for response in [
            Ok(vec![rate("USD", "4.02")]),
            Err(RatesFetchError::Transport("down".to_string())),
        ] {
            let gate = Arc::new(Notify::new());
            let rates = Arc::new(MockRates::new(vec![response]).gated(gate.clone()));
            let store = store_with(rates.clone(), MockMarket::default());
            assert!(!store.loading());

            let handle = tokio::spawn({
                let store = store.clone();
                async move { store.fetch_exchange_rates().await }
            });
            wait_for_calls(&rates, 1).await;
            assert!(store.loading());
            assert!(store.snapshot().await.loading);

            gate.notify_one();
            handle.await.unwrap();
            assert!(!store.loading());
        }
    }

    #[tokio::test]
    async fn test_manual_fetch_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let rates = Arc::new(MockRates::new(vec![Ok(vec![rate("USD", "4.02")])]).gated(gate.clone()));
        let store = store_with(rates.clone(), MockMarket::default());

        let handle = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_exchange_rates().await }
        });
        wait_for_calls(&rates, 1).await;

        assert_eq!(
            store.fetch_exchange_rates().await,
            RefreshOutcome::AlreadyInFlight
        );
        gate.notify_one();
        assert_eq!(handle.await.unwrap(), RefreshOutcome::Updated);
        assert_eq!(rates.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_init_fetches_once() {
        let gate = Arc::new(Notify::new());
        let rates = Arc::new(MockRates::new(vec![Ok(vec![rate("USD", "4.02")])]).gated(gate.clone()));
        let store = store_with(rates.clone(), MockMarket::default());

        let (first, second, _) = tokio::join!(store.init(), store.init(), async {
            gate.notify_one();
        });

        assert_eq!(rates.calls(), 1);
        assert_eq!(first, RefreshOutcome::Updated);
        assert_eq!(second, RefreshOutcome::AlreadyInFlight);

        assert_eq!(store.init().await, RefreshOutcome::Unchanged);
        assert_eq!(rates.calls(), 1);
    }

    #[tokio::test]
    async fn test_market_stats_merge() {
        let rates = Arc::new(MockRates::new(vec![Ok(vec![rate("USD", "4.0")])]));
        let market = MockMarket::new(vec![
            stats(json!({"data": {
                "total_market_cap": {"usd": 900},
                "total_volume": {"usd": 100},
                "market_cap_percentage": {"btc": 51.5}
            }})),
            stats(json!({"data": {"total_market_cap": {"usd": 1000}, "total_volume": {"usd": 500}}})),
            stats(json!({"data": {"total_market_cap": {"usd": 2000}}})),
        ]);
        let store = store_with(rates, market);
        store.fetch_exchange_rates().await;

        assert_eq!(store.fetch_market_stats().await, RefreshOutcome::Updated);
        let first = store.market_stats().await;
        assert_eq!(first.btc_dominance, Some(51.5));

        store.fetch_market_stats().await;
        let second = store.market_stats().await;
        assert_eq!(second.market_cap_pln, Some(4000.0));
        assert_eq!(second.volume_24h_pln, Some(2000.0));
        assert_eq!(second.btc_dominance, Some(51.5));
        assert!(second.updated_at >= first.updated_at);

        store.fetch_market_stats().await;
        let third = store.market_stats().await;
        assert_eq!(third.market_cap_pln, Some(8000.0));
        assert_eq!(third.volume_24h_pln, Some(2000.0));
    }

    #[tokio::test]
    async fn test_market_stats_without_usd_rate() {
        let rates = Arc::new(MockRates::new(vec![]));
        let market = MockMarket::new(vec![stats(json!({"data": {
            "total_market_cap": {"usd": 1000},
            "market_cap_percentage": {"btc": 50.0}
        }}))]);
        let store = store_with(rates, market);

        store.fetch_market_stats().await;
        let stats = store.market_stats().await;
        assert_eq!(stats.market_cap_pln, None);
        assert_eq!(stats.btc_dominance, Some(50.0));
        assert!(stats.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_market_stats_leave_store_untouched() {
        let rates = Arc::new(MockRates::new(vec![Ok(vec![rate("USD", "4.0")])]));
        let market = MockMarket::new(vec![
            stats(json!({"data": {"total_market_cap": {"usd": 1000}}})),
            RawMarketStats::empty(),
        ]);
        let store = store_with(rates, market);
        store.fetch_exchange_rates().await;

        store.fetch_market_stats().await;
        let before = store.market_stats().await;
        assert_eq!(store.fetch_market_stats().await, RefreshOutcome::Unchanged);
        assert_eq!(store.market_stats().await, before);
        assert!(store.error().await.is_none());
    }

    #[tokio::test]
    async fn test_revision_advances_on_refresh() {
        let rates = Arc::new(MockRates::new(vec![Ok(vec![rate("USD", "4.0")])]));
        let store = store_with(rates, MockMarket::default());
        let mut rx = store.subscribe();
        let start = *rx.borrow_and_update();

        store.fetch_exchange_rates().await;
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update() > start);
    }
}
