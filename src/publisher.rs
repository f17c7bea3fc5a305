//! Background fetch cycle feeding the snapshot channel.
//!
//! One task owns all network access. Each cycle it resolves the market
//! window, fetches a quote and price history per symbol, publishes the
//! result as one snapshot, then sleeps until the next refresh while
//! polling the stop signal.

use std::sync::Arc;

use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::calendar::MarketCalendar;
use crate::channel::SnapshotChannel;
use crate::config::AppConfig;
use crate::fetch::{DataFetcher, INTER_REQUEST_DELAY};
use crate::models::{MarketWindow, Snapshot};

/// How often the inter-cycle sleep checks the stop signal.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// How long shutdown waits for the task to finish its current cycle.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);
/// Samples fetched per symbol, sized to typical panel widths.
const SERIES_CAPACITY: usize = 64;

pub struct UpdatePublisher {
    fetcher: DataFetcher,
    calendar: MarketCalendar,
    channel: Arc<SnapshotChannel>,
    symbols: Vec<String>,
    refresh_interval: Duration,
    include_trending: bool,
    trending_count: usize,
    stop: watch::Receiver<bool>,
}

/// Owner side of a running publisher task.
pub struct PublisherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PublisherHandle {
    /// Signals the task to stop and waits briefly for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if tokio::time::timeout(SHUTDOWN_GRACE, self.task).await.is_err() {
            warn!("publisher did not stop within grace period, detaching");
        }
    }
}

impl UpdatePublisher {
    /// Spawns the publish loop and returns its handle.
    pub fn spawn(
        fetcher: DataFetcher,
        calendar: MarketCalendar,
        channel: Arc<SnapshotChannel>,
        config: &AppConfig,
    ) -> PublisherHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let publisher = Self {
            fetcher,
            calendar,
            channel,
            symbols: config.symbols.clone(),
            refresh_interval: Duration::from_secs(config.refresh_minutes * 60),
            include_trending: config.include_trending,
            trending_count: config.trending_count,
            stop: stop_rx,
        };
        let task = tokio::spawn(publisher.run());
        PublisherHandle {
            stop: stop_tx,
            task,
        }
    }

    async fn run(mut self) {
        info!(
            symbols = ?self.symbols,
            refresh_secs = self.refresh_interval.as_secs(),
            "publisher started"
        );
        // Start with cheap arithmetic so the first cycle fetches data
        // immediately instead of probing the calendar first.
        let mut window = self.calendar.fallback_window(Utc::now());
        let mut window_deadline = Instant::now();

        loop {
            if *self.stop.borrow() {
                break;
            }

            if Instant::now() >= window_deadline {
                match self.calendar.market_window(Utc::now()).await {
                    Ok(fresh) => {
                        let until_reevaluation = (fresh.next_reevaluation - Utc::now())
                            .to_std()
                            .unwrap_or(Duration::from_secs(60));
                        window_deadline = Instant::now() + until_reevaluation;
                        window = fresh;
                    }
                    Err(e) => {
                        warn!(error = %e, "market window refresh failed, keeping previous");
                        window_deadline = Instant::now() + Duration::from_secs(30 * 60);
                    }
                }
            }

            let symbols = self.cycle_symbols().await;
            let snapshot = self.build_snapshot(symbols, window.clone()).await;
            if self.channel.publish(snapshot) {
                debug!("displaced an unconsumed snapshot");
            }

            if self.sleep_until_next_cycle().await {
                break;
            }
        }
        info!("publisher stopped");
    }

    /// Configured symbols plus trending ones, duplicates removed,
    /// configured order first.
    async fn cycle_symbols(&self) -> Vec<String> {
        if !self.include_trending {
            return self.symbols.clone();
        }
        match self.fetcher.fetch_trending(self.trending_count).await {
            Ok(trending) => union_preserving_order(&self.symbols, &trending),
            Err(e) => {
                warn!(error = %e, "trending fetch failed, using configured symbols");
                self.symbols.clone()
            }
        }
    }

    async fn build_snapshot(&self, symbols: Vec<String>, window: MarketWindow) -> Snapshot {
        let mut snapshot = Snapshot::new(symbols, window);
        for symbol in snapshot.symbols.clone() {
            match self.fetcher.fetch_quote(&symbol).await {
                Ok(quote) => {
                    snapshot.quotes.insert(symbol.clone(), quote);
                }
                Err(e) => warn!(%symbol, error = %e, "quote fetch failed, skipping"),
            }
            tokio::time::sleep(INTER_REQUEST_DELAY).await;

            match self.fetcher.fetch_series(&symbol, SERIES_CAPACITY).await {
                Ok(series) => {
                    snapshot.series.insert(symbol.clone(), series);
                }
                Err(e) => warn!(%symbol, error = %e, "series fetch failed, skipping"),
            }
            tokio::time::sleep(INTER_REQUEST_DELAY).await;
        }
        snapshot.fetched_at = Utc::now();
        snapshot
    }

    /// Sleeps out the refresh interval in short slices so a stop signal
    /// is honored promptly. Returns `true` when stopping.
    async fn sleep_until_next_cycle(&mut self) -> bool {
        let deadline = Instant::now() + self.refresh_interval;
        while Instant::now() < deadline {
            if *self.stop.borrow() {
                return true;
            }
            let remaining = deadline - Instant::now();
            tokio::time::sleep(remaining.min(STOP_POLL_INTERVAL)).await;
        }
        *self.stop.borrow()
    }
}

/// Appends items from `extra` that `base` does not already contain.
fn union_preserving_order(base: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = base.to_vec();
    for symbol in extra {
        if !merged.contains(symbol) {
            merged.push(symbol.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{ExchangeStatus, MarketCalendar, MarketProbe, WeekdayProbe};
    use crate::fetch::{FetchError, Synthetic};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate};

    fn to_strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn union_keeps_order_and_dedups() {
        let base = to_strings(&["AAPL", "TSLA"]);
        let extra = to_strings(&["GME", "TSLA", "AMC"]);
        assert_eq!(
            union_preserving_order(&base, &extra),
            to_strings(&["AAPL", "TSLA", "GME", "AMC"])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn demo_cycle_publishes_then_stops() {
        let config = AppConfig {
            symbols: to_strings(&["AAPL", "TSLA"]),
            refresh_minutes: 5,
            display_seconds: 10,
            demo_mode: true,
            include_trending: true,
            trending_count: 2,
            provider_api_key: None,
        };
        let channel = Arc::new(SnapshotChannel::new());
        let handle = UpdatePublisher::spawn(
            DataFetcher::from_config(&config),
            MarketCalendar::nyse(Arc::new(WeekdayProbe::nyse())),
            Arc::clone(&channel),
            &config,
        );

        // Paused time auto-advances through the cycle's sleeps.
        let mut snapshot = None;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(s) = channel.drain() {
                snapshot = Some(s);
                break;
            }
        }
        let snapshot = snapshot.expect("publisher produced no snapshot");

        // Configured symbols plus synthetic trending.
        assert_eq!(
            snapshot.symbols,
            to_strings(&["AAPL", "TSLA", "GME", "AMC"])
        );
        let quote = snapshot.quote("AAPL").expect("quote for AAPL");
        assert!((50.0..500.0).contains(&quote.price));
        assert!(snapshot.series_for("AAPL").is_some_and(|s| s.len() >= 2));

        handle.shutdown().await;
    }

    /// Probe that errors on every call, as if the provider is down.
    struct DeadProbe;

    #[async_trait]
    impl MarketProbe for DeadProbe {
        async fn is_trading_day(&self, _: NaiveDate) -> Result<bool, FetchError> {
            Err(FetchError::Network("probe offline".into()))
        }

        async fn exchange_status(
            &self,
            _: DateTime<Utc>,
        ) -> Result<ExchangeStatus, FetchError> {
            Err(FetchError::Network("probe offline".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn window_refresh_failure_keeps_fallback_window() {
        let config = AppConfig {
            symbols: to_strings(&["AAPL"]),
            refresh_minutes: 5,
            display_seconds: 10,
            demo_mode: true,
            include_trending: false,
            trending_count: 0,
            provider_api_key: None,
        };
        let channel = Arc::new(SnapshotChannel::new());
        // The walk-back exhausts its lookback against a dead probe, so
        // every window refresh fails; the cycle must still publish with
        // the arithmetic fallback window.
        let handle = UpdatePublisher::spawn(
            DataFetcher::new(vec![Box::new(Synthetic::new())]),
            MarketCalendar::nyse(Arc::new(DeadProbe)),
            Arc::clone(&channel),
            &config,
        );

        let mut snapshot = None;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(s) = channel.drain() {
                snapshot = Some(s);
                break;
            }
        }
        let snapshot = snapshot.expect("publisher produced no snapshot");

        assert!(!snapshot.window.is_open);
        assert!(snapshot.window.previous_trading_day < snapshot.window.trading_day);
        assert!(snapshot.quote("AAPL").is_some());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn synthetic_chain_covers_every_symbol() {
        let window = MarketCalendar::nyse(Arc::new(WeekdayProbe::nyse()))
            .fallback_window(Utc::now());
        let publisher = UpdatePublisher {
            fetcher: DataFetcher::new(vec![Box::new(Synthetic::new())]),
            calendar: MarketCalendar::nyse(Arc::new(WeekdayProbe::nyse())),
            channel: Arc::new(SnapshotChannel::new()),
            symbols: to_strings(&["AAPL", "MSFT"]),
            refresh_interval: Duration::from_secs(300),
            include_trending: false,
            trending_count: 0,
            stop: watch::channel(false).1,
        };
        // Paused time auto-advances through the inter-request delays.
        let symbols = publisher.symbols.clone();
        let snapshot = publisher.build_snapshot(symbols, window).await;
        for symbol in ["AAPL", "MSFT"] {
            assert!(snapshot.quote(symbol).is_some());
            assert!(snapshot.series_for(symbol).is_some());
        }
    }
}
