use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::http::ApiClient;
use crate::core::{RatesFetchError, RatesProvider, RawRate};

pub const EXCHANGE_RATES_PATH: &str = "/api/exchange-management/exchanges/rates";

/// Reads exchange rates from the backend-for-frontend service.
pub struct BffRatesProvider {
    api: ApiClient,
}

impl BffRatesProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(BffRatesProvider {
            api: ApiClient::new("BFF API", base_url, timeout)?,
        })
    }

    async fn request_rates(&self) -> Result<Vec<RawRate>, RatesFetchError> {
        let response = self
            .api
            .get(EXCHANGE_RATES_PATH)
            .await
            .map_err(RatesFetchError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(RatesFetchError::transport)?;

        if !status.is_success() {
            let message = upstream_message(&body)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            return Err(RatesFetchError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            debug!("Empty rates body, treating as no rates");
            return Ok(Vec::new());
        }

        let items: Option<Vec<RawRate>> = serde_json::from_str(&body).map_err(|e| {
            RatesFetchError::malformed(format!("Failed to parse exchange rates response: {e}"))
        })?;
        Ok(items.unwrap_or_default())
    }
}

/// Pulls a non-empty `message` out of a JSON error body.
fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    (!message.is_empty()).then(|| message.to_string())
}

#[async_trait]
impl RatesProvider for BffRatesProvider {
    #[instrument(name = "BffRatesFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<Vec<RawRate>, RatesFetchError> {
        let result = self.request_rates().await;
        match &result {
            Ok(items) => debug!(count = items.len(), "Fetched exchange rates"),
            Err(e) => error!(error = %e, "Error fetching exchange rates"),
        }
        result
    }
}
