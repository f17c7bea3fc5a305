//! Yahoo Finance chart and screener endpoints.
//!
//! Primary data source. Quotes and daily series come from the public
//! chart endpoint, trending symbols from the predefined screeners, and
//! the same chart endpoint doubles as the holiday probe by asking for
//! minute bars inside a day's regular session.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{FetchError, QuoteProvider};
use crate::calendar::{ExchangeStatus, MarketProbe, session_status};
use crate::models::{PriceSeries, Quote};

const BASE_URL: &str = "https://query1.finance.yahoo.com";
/// The chart endpoint rejects default HTTP-library agents.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const SESSION_OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
const SESSION_CLOSE: NaiveTime = NaiveTime::from_hms_opt(16, 0, 0).unwrap();

pub struct Yahoo {
    client: Client,
    base_url: String,
}

impl Yahoo {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL.to_string())
    }

    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { client, base_url }
    }

    async fn get_chart(&self, symbol: &str, query: &str) -> Result<ChartResponse, FetchError> {
        let url = format!("{}/v8/finance/chart/{symbol}?{query}", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(FetchError::Network(format!(
                "chart request for {symbol} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

impl Default for Yahoo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for Yahoo {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let chart = self.get_chart(symbol, "interval=1d&range=1d").await?;
        quote_from_chart(symbol, &chart)
    }

    async fn fetch_series(&self, symbol: &str, length: usize) -> Result<PriceSeries, FetchError> {
        // 3mo of daily bars comfortably covers any panel width.
        let chart = self.get_chart(symbol, "interval=1d&range=3mo").await?;
        series_from_chart(symbol, &chart, length)
    }

    async fn fetch_trending(&self, count: usize) -> Result<Vec<String>, FetchError> {
        let mut symbols = Vec::new();
        for screener in ["day_gainers", "day_losers"] {
            // An earlier screener already filled the quota; skip the
            // extra request against a rate-limited endpoint.
            if symbols.len() >= count {
                break;
            }
            let url = format!(
                "{}/v1/finance/screener/predefined/saved?scrIds={screener}&count={count}",
                self.base_url
            );
            let response = self.client.get(&url).send().await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Err(FetchError::RateLimited);
            }
            if !response.status().is_success() {
                return Err(FetchError::Network(format!(
                    "screener {screener} returned {}",
                    response.status()
                )));
            }
            let parsed: ScreenerResponse = response.json().await?;
            for result in parsed.finance.result {
                extend_unique(&mut symbols, result.quotes);
            }
        }
        if symbols.is_empty() {
            return Err(FetchError::Unavailable("screeners returned no symbols".into()));
        }
        symbols.truncate(count);
        Ok(symbols)
    }
}

#[async_trait]
impl MarketProbe for Yahoo {
    /// A day traded if SPY has any minute bars inside its regular session.
    async fn is_trading_day(&self, day: NaiveDate) -> Result<bool, FetchError> {
        let tz = chrono_tz::America::New_York;
        let open = session_epoch(tz, day, SESSION_OPEN)?;
        let close = session_epoch(tz, day, SESSION_CLOSE)?;
        let chart = self
            .get_chart("SPY", &format!("interval=1m&period1={open}&period2={close}"))
            .await?;
        let traded = chart
            .chart
            .result
            .first()
            .and_then(|r| r.timestamp.as_ref())
            .is_some_and(|ts| !ts.is_empty());
        debug!(%day, traded, "trading-day probe");
        Ok(traded)
    }

    async fn exchange_status(&self, now: DateTime<Utc>) -> Result<ExchangeStatus, FetchError> {
        let tz = chrono_tz::America::New_York;
        let today = now.with_timezone(&tz).date_naive();
        let trading_today = self.is_trading_day(today).await?;
        Ok(session_status(now, tz, trading_today))
    }
}

fn session_epoch(
    tz: chrono_tz::Tz,
    day: NaiveDate,
    time: NaiveTime,
) -> Result<i64, FetchError> {
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| FetchError::Unavailable(format!("no local time for {day}")))
}

// Wire format of /v8/finance/chart.

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Deserialize)]
struct QuoteArrays {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn quote_from_chart(symbol: &str, chart: &ChartResponse) -> Result<Quote, FetchError> {
    let meta = &chart
        .chart
        .result
        .first()
        .ok_or_else(|| FetchError::Unavailable(format!("no chart data for {symbol}")))?
        .meta;
    let price = meta
        .regular_market_price
        .ok_or_else(|| FetchError::Unavailable(format!("no market price for {symbol}")))?;
    let prior = meta
        .previous_close
        .or(meta.chart_previous_close)
        .unwrap_or(price);
    let change = price - prior;
    let change_percent = if prior != 0.0 {
        change / prior * 100.0
    } else {
        0.0
    };
    Ok(Quote::new(symbol, price, change, change_percent))
}

fn series_from_chart(
    symbol: &str,
    chart: &ChartResponse,
    length: usize,
) -> Result<PriceSeries, FetchError> {
    let closes = chart
        .chart
        .result
        .first()
        .and_then(|r| r.indicators.as_ref())
        .and_then(|i| i.quote.first())
        .map(|q| q.close.iter().flatten().copied())
        .ok_or_else(|| FetchError::Unavailable(format!("no close history for {symbol}")))?;
    let series = PriceSeries::from_closes(symbol, closes, length);
    if series.is_empty() {
        return Err(FetchError::Unavailable(format!("empty close history for {symbol}")));
    }
    Ok(series)
}

fn extend_unique(symbols: &mut Vec<String>, quotes: Vec<ScreenerQuote>) {
    for entry in quotes {
        if !symbols.contains(&entry.symbol) {
            symbols.push(entry.symbol);
        }
    }
}

// Wire format of the predefined screeners.

#[derive(Debug, Deserialize)]
struct ScreenerResponse {
    finance: ScreenerFinance,
}

#[derive(Debug, Deserialize)]
struct ScreenerFinance {
    #[serde(default)]
    result: Vec<ScreenerResult>,
}

#[derive(Debug, Deserialize)]
struct ScreenerResult {
    #[serde(default)]
    quotes: Vec<ScreenerQuote>,
}

#[derive(Debug, Deserialize)]
struct ScreenerQuote {
    symbol: String,
}
