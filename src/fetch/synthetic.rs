//! Deterministic synthetic market data.
//!
//! Terminates the provider chain: every call succeeds, so the display is
//! never blank even fully offline. Values are seeded from the symbol
//! name, which keeps a given symbol's demo price stable across restarts
//! and makes tests reproducible.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FetchError, QuoteProvider};
use crate::models::{PriceSeries, Quote};

/// Trending list shown when no live screener is reachable.
pub const FALLBACK_TRENDING: [&str; 6] = ["GME", "AMC", "PLTR", "RIVN", "LCID", "SOFI"];

const PRICE_RANGE: std::ops::Range<f64> = 50.0..500.0;
const CHANGE_PERCENT_RANGE: std::ops::Range<f64> = -5.0..5.0;
/// Series starts at this fraction of the quote price.
const SERIES_START_FACTOR: f64 = 0.9;
/// Per-step move range, as a fraction of the current value.
const STEP_RANGE: std::ops::Range<f64> = -0.03..0.035;
/// Prices never walk below this fraction of the quote price.
const SERIES_FLOOR_FACTOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default)]
pub struct Synthetic;

impl Synthetic {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn quote_for(symbol: &str) -> Quote {
        let mut rng = StdRng::seed_from_u64(seed_for(symbol));
        let price = round_cents(rng.gen_range(PRICE_RANGE));
        let change_percent = round_cents(rng.gen_range(CHANGE_PERCENT_RANGE));
        let change = round_cents(price * change_percent / 100.0);
        Quote::new(symbol, price, change, change_percent)
    }
}

#[async_trait]
impl QuoteProvider for Synthetic {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        Ok(Self::quote_for(symbol))
    }

    async fn fetch_series(&self, symbol: &str, length: usize) -> Result<PriceSeries, FetchError> {
        let quote = Self::quote_for(symbol);
        // Offset the seed so the walk is independent of the quote draw.
        let mut rng = StdRng::seed_from_u64(seed_for(symbol) ^ 0x9e37_79b9);
        let floor = quote.price * SERIES_FLOOR_FACTOR;
        // Bias the walk so it trends toward the quoted price and change
        // direction instead of wandering arbitrarily.
        let drift = if quote.is_gain() { 0.002 } else { -0.002 };

        let mut value = quote.price * SERIES_START_FACTOR;
        let mut closes = Vec::with_capacity(length);
        for _ in 0..length {
            closes.push(round_cents(value));
            let step = rng.gen_range(STEP_RANGE) + drift;
            value = (value * (1.0 + step)).max(floor);
        }
        Ok(PriceSeries::from_closes(symbol, closes, length))
    }

    async fn fetch_trending(&self, count: usize) -> Result<Vec<String>, FetchError> {
        Ok(FALLBACK_TRENDING
            .iter()
            .take(count)
            .map(|s| (*s).to_string())
            .collect())
    }
}

/// FNV-1a over the symbol name.
fn seed_for(symbol: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in symbol.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
