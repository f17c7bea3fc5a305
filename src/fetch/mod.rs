//! Market-data acquisition with a provider fallback chain.
//!
//! Providers are tried in order; a rate-limited provider is retried after
//! waiting out the current minute, any other failure moves on to the next
//! provider. The chain normally ends with the synthetic generator, which
//! cannot fail, so display code always has something to show.

pub mod alphavantage;
pub mod synthetic;
pub mod yahoo;

pub use alphavantage::AlphaVantage;
pub use synthetic::Synthetic;
pub use yahoo::Yahoo;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::models::{PriceSeries, Quote};

/// Errors a single provider request can produce.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure: DNS, connect, timeout, bad status.
    #[error("network error: {0}")]
    Network(String),

    /// The provider signalled a per-minute quota was hit.
    #[error("provider rate limit reached")]
    RateLimited,

    /// The provider answered but had no usable data for the request.
    #[error("data unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

/// One upstream market-data source.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError>;

    /// Daily closing prices, oldest first, at most `length` samples.
    async fn fetch_series(&self, symbol: &str, length: usize) -> Result<PriceSeries, FetchError>;

    /// Up to `count` currently-trending symbols.
    async fn fetch_trending(&self, count: usize) -> Result<Vec<String>, FetchError>;
}

/// Total attempts made against one provider when it keeps rate limiting.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Pause between consecutive requests within a fetch cycle, so bursts of
/// per-symbol calls stay under provider limits.
pub(crate) const INTER_REQUEST_DELAY: Duration = Duration::from_millis(200);

/// Time until the next minute boundary, when per-minute quotas reset.
/// Always at least one second so a call at second 59 still waits.
#[must_use]
pub fn delay_to_next_minute(now: DateTime<Utc>) -> Duration {
    Duration::from_secs(u64::from((60 - now.second()).max(1)))
}

/// Ordered provider chain with rate-limit-aware retry.
pub struct DataFetcher {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl DataFetcher {
    #[must_use]
    pub fn new(providers: Vec<Box<dyn QuoteProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the chain the configuration asks for.
    ///
    /// Demo mode uses the synthetic generator alone. Otherwise Yahoo is
    /// primary, Alpha Vantage is added when a key is configured, and the
    /// synthetic generator terminates the chain.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        if config.demo_mode {
            return Self::new(vec![Box::new(Synthetic::new())]);
        }
        let mut providers: Vec<Box<dyn QuoteProvider>> = vec![Box::new(Yahoo::new())];
        if let Some(key) = &config.provider_api_key {
            providers.push(Box::new(AlphaVantage::new(key.clone())));
        }
        providers.push(Box::new(Synthetic::new()));
        Self::new(providers)
    }

    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.with_fallback(symbol, |provider| provider.fetch_quote(symbol))
            .await
    }

    pub async fn fetch_series(&self, symbol: &str, length: usize) -> Result<PriceSeries, FetchError> {
        self.with_fallback(symbol, |provider| provider.fetch_series(symbol, length))
            .await
    }

    pub async fn fetch_trending(&self, count: usize) -> Result<Vec<String>, FetchError> {
        self.with_fallback("trending", |provider| provider.fetch_trending(count))
            .await
    }

    /// Runs `op` against each provider in turn until one succeeds.
    ///
    /// A rate-limited provider is retried up to [`MAX_RATE_LIMIT_RETRIES`]
    /// total attempts, sleeping to the next minute boundary between them.
    async fn with_fallback<'a, T, F, Fut>(&'a self, what: &str, op: F) -> Result<T, FetchError>
    where
        F: Fn(&'a dyn QuoteProvider) -> Fut,
        Fut: std::future::Future<Output = Result<T, FetchError>> + 'a,
    {
        let mut last_err = FetchError::Unavailable("no providers configured".into());
        for provider in &self.providers {
            let mut attempts: u32 = 0;
            loop {
                match op(provider.as_ref()).await {
                    Ok(value) => return Ok(value),
                    Err(FetchError::RateLimited) if attempts + 1 < MAX_RATE_LIMIT_RETRIES => {
                        attempts += 1;
                        let wait = delay_to_next_minute(Utc::now());
                        debug!(
                            provider = provider.name(),
                            what,
                            attempt = attempts,
                            wait_secs = wait.as_secs(),
                            "rate limited, waiting for quota reset"
                        );
                        tokio::time::sleep(wait).await;
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), what, error = %e, "provider failed");
                        last_err = e;
                        break;
                    }
                }
            }
        }
        Err(last_err)
    }
}
