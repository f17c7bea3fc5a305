//! Alpha Vantage fallback provider.
//!
//! Free-tier keys get 25 requests per day and 5 per minute; the API
//! reports quota exhaustion with HTTP 200 and a "Note" field, and answers
//! unknown symbols with an all-zero quote, so both conditions are mapped
//! to errors here rather than leaking into the display.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{FetchError, QuoteProvider};
use crate::models::{PriceSeries, Quote};

const BASE_URL: &str = "https://www.alphavantage.co";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
/// Price Alpha Vantage returns for symbols it does not know.
const UNKNOWN_SYMBOL_SENTINEL: &str = "0.0000";

pub struct AlphaVantage {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantage {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL.to_string())
    }

    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            api_key,
            base_url,
        }
    }

    async fn query(&self, function: &str, symbol: &str) -> Result<reqwest::Response, FetchError> {
        let url = format!(
            "{}/query?function={function}&symbol={symbol}&apikey={}",
            self.base_url, self.api_key
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Network(format!(
                "{function} request for {symbol} returned {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantage {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let body: GlobalQuoteResponse =
            self.query("GLOBAL_QUOTE", symbol).await?.json().await?;
        quote_from_response(symbol, body)
    }

    async fn fetch_series(&self, symbol: &str, length: usize) -> Result<PriceSeries, FetchError> {
        let body: DailySeriesResponse =
            self.query("TIME_SERIES_DAILY", symbol).await?.json().await?;
        series_from_response(symbol, body, length)
    }

    /// Alpha Vantage has no trending endpoint; the chain falls through.
    async fn fetch_trending(&self, _count: usize) -> Result<Vec<String>, FetchError> {
        Err(FetchError::Unavailable("no trending endpoint".into()))
    }
}

// Wire formats. Alpha Vantage numbers arrive as strings, and quota or
// input errors ride along in the same 200 response.

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "09. change")]
    change: String,
    #[serde(rename = "10. change percent")]
    change_percent: String,
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, DailyBar>>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: String,
}

fn quote_from_response(symbol: &str, body: GlobalQuoteResponse) -> Result<Quote, FetchError> {
    if body.note.is_some() {
        return Err(FetchError::RateLimited);
    }
    if let Some(message) = body.error_message {
        return Err(FetchError::Unavailable(message));
    }
    let raw = body
        .global_quote
        .ok_or_else(|| FetchError::Unavailable(format!("no quote for {symbol}")))?;
    if raw.price == UNKNOWN_SYMBOL_SENTINEL {
        return Err(FetchError::Unavailable(format!("unknown symbol {symbol}")));
    }
    let price = parse_number(&raw.price, symbol)?;
    let change = parse_number(&raw.change, symbol)?;
    let change_percent = parse_number(raw.change_percent.trim_end_matches('%'), symbol)?;
    Ok(Quote::new(symbol, price, change, change_percent))
}

fn series_from_response(
    symbol: &str,
    body: DailySeriesResponse,
    length: usize,
) -> Result<PriceSeries, FetchError> {
    if body.note.is_some() {
        return Err(FetchError::RateLimited);
    }
    if let Some(message) = body.error_message {
        return Err(FetchError::Unavailable(message));
    }
    let bars = body
        .time_series
        .ok_or_else(|| FetchError::Unavailable(format!("no daily series for {symbol}")))?;
    // BTreeMap keys are ISO dates, so iteration order is chronological;
    // keep the newest `length` entries.
    let mut closes = Vec::with_capacity(bars.len());
    for (day, bar) in &bars {
        closes.push(parse_number(&bar.close, &format!("{symbol} {day}"))?);
    }
    if closes.len() > length {
        closes.drain(..closes.len() - length);
    }
    if closes.is_empty() {
        return Err(FetchError::Unavailable(format!("empty daily series for {symbol}")));
    }
    Ok(PriceSeries::from_closes(symbol, closes, length))
}

fn parse_number(raw: &str, context: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse()
        .map_err(|_| FetchError::Unavailable(format!("unparseable number {raw:?} for {context}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_parses_global_quote() {
        let body: GlobalQuoteResponse = serde_json::from_str(
            r#"{
                "Global Quote": {
                    "01. symbol": "AAPL",
                    "05. price": "187.4400",
                    "09. change": "2.4000",
                    "10. change percent": "1.2970%"
                }
            }"#,
        )
        .unwrap();
        let quote = quote_from_response("AAPL", body).unwrap();
        assert_eq!(quote.price, 187.44);
        assert_eq!(quote.change, 2.4);
        assert_eq!(quote.change_percent, 1.297);
    }

    #[test]
    fn note_means_rate_limited() {
        let body: GlobalQuoteResponse = serde_json::from_str(
            r#"{"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#,
        )
        .unwrap();
        assert!(matches!(
            quote_from_response("AAPL", body),
            Err(FetchError::RateLimited)
        ));
    }

    #[test]
    fn zero_price_sentinel_is_unavailable() {
        let body: GlobalQuoteResponse = serde_json::from_str(
            r#"{
                "Global Quote": {
                    "05. price": "0.0000",
                    "09. change": "0.0000",
                    "10. change percent": "0.0000%"
                }
            }"#,
        )
        .unwrap();
        assert!(matches!(
            quote_from_response("NOPE", body),
            Err(FetchError::Unavailable(_))
        ));
    }

    #[test]
    fn daily_series_is_chronological_and_bounded() {
        let body: DailySeriesResponse = serde_json::from_str(
            r#"{
                "Time Series (Daily)": {
                    "2024-03-20": {"4. close": "187.44"},
                    "2024-03-18": {"4. close": "184.25"},
                    "2024-03-19": {"4. close": "185.04"}
                }
            }"#,
        )
        .unwrap();
        let series = series_from_response("AAPL", body, 2).unwrap();
        assert_eq!(series.closes(), &[185.04, 187.44]);
    }

    #[test]
    fn series_note_means_rate_limited() {
        let body: DailySeriesResponse =
            serde_json::from_str(r#"{"Note": "rate limit"}"#).unwrap();
        assert!(matches!(
            series_from_response("AAPL", body, 10),
            Err(FetchError::RateLimited)
        ));
    }
}
