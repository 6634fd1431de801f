//! Self-rescheduling refresh timers.
//!
//! Each [`AutoRefresh`] runs a single chain: wait one interval, run the job to
//! completion, wait again. The next wait only starts once the previous job has
//! finished, so a slow upstream stretches the period instead of stacking
//! requests. Stopping is cooperative: the pending wait is cut short, but a job
//! that is already running is left to finish.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::config::RefreshConfig;
use crate::store::RefreshStore;

struct Chain {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// A cancellable periodic task. Dropping it stops the chain.
pub struct AutoRefresh {
    name: &'static str,
    interval: Duration,
    chain: Mutex<Option<Chain>>,
}

impl AutoRefresh {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        AutoRefresh {
            name,
            interval,
            chain: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|chain| !chain.handle.is_finished())
    }

    /// Arms the chain. Returns `false` without doing anything if it is
    /// already running. Must be called inside a tokio runtime.
    pub fn start<F, Fut>(&self, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|chain| !chain.handle.is_finished()) {
            debug!(name = self.name, "Auto-refresh already active");
            return false;
        }

        let (stop, stopped) = watch::channel(false);
        let handle = tokio::spawn(run_chain(self.name, self.interval, stopped, job));
        *slot = Some(Chain { stop, handle });
        info!(
            name = self.name,
            interval_ms = self.interval.as_millis() as u64,
            "Auto-refresh started"
        );
        true
    }

    /// Stops the chain. Idempotent; returns whether a chain was running.
    pub fn stop(&self) -> bool {
        let Some(chain) = self.slot().take() else {
            return false;
        };
        // Fails only if the chain already exited.
        let _ = chain.stop.send(true);
        info!(name = self.name, "Auto-refresh stopped");
        true
    }

    fn slot(&self) -> MutexGuard<'_, Option<Chain>> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_chain<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut stopped: watch::Receiver<bool>,
    job: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        tokio::select! {
            biased;
            // A closed channel means the owner is gone; treat it as a stop.
            _ = stopped.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        if *stopped.borrow() {
            break;
        }
        debug!(name, "Auto-refresh tick");
        job().await;
    }
    debug!(name, "Auto-refresh chain exited");
}

/// Auto-refresh for both data classes of a [`RefreshStore`].
pub struct Scheduler {
    store: Arc<RefreshStore>,
    rates: AutoRefresh,
    market_stats: AutoRefresh,
}

impl Scheduler {
    pub fn new(store: Arc<RefreshStore>, config: &RefreshConfig) -> Self {
        Scheduler {
            store,
            rates: AutoRefresh::new("rates", config.rates_interval()),
            market_stats: AutoRefresh::new("market_stats", config.market_stats_interval()),
        }
    }

    pub fn start_auto_refresh(&self) -> bool {
        let store = Arc::clone(&self.store);
        self.rates.start(move || {
            let store = Arc::clone(&store);
            async move {
                store.fetch_exchange_rates().await;
            }
        })
    }

    pub fn stop_auto_refresh(&self) -> bool {
        self.rates.stop()
    }

    pub fn start_market_stats_auto_refresh(&self) -> bool {
        let store = Arc::clone(&self.store);
        self.market_stats.start(move || {
            let store = Arc::clone(&store);
            async move {
                store.fetch_market_stats().await;
            }
        })
    }

    pub fn stop_market_stats_auto_refresh(&self) -> bool {
        self.market_stats.stop()
    }

    pub fn rates_interval(&self) -> Duration {
        self.rates.interval()
    }

    pub fn market_stats_interval(&self) -> Duration {
        self.market_stats.interval()
    }

    pub fn is_auto_refresh_active(&self) -> bool {
        self.rates.is_active()
    }

    pub fn is_market_stats_auto_refresh_active(&self) -> bool {
        self.market_stats.is_active()
    }

    pub fn stop_all(&self) {
        self.stop_auto_refresh();
        self.stop_market_stats_auto_refresh();
    }
}
