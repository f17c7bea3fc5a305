//! Immutable result of one publisher fetch cycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MarketWindow, PriceSeries, Quote};

/// Everything the display loop needs, produced atomically per cycle.
///
/// `symbols` fixes the rotation order; `quotes` and `series` may be
/// missing entries for symbols whose fetch failed this cycle. Consumers
/// never mutate a snapshot, they swap it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbols: Vec<String>,
    pub quotes: HashMap<String, Quote>,
    pub series: HashMap<String, PriceSeries>,
    pub window: MarketWindow,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn new(symbols: Vec<String>, window: MarketWindow) -> Self {
        Self {
            symbols,
            quotes: HashMap::new(),
            series: HashMap::new(),
            window,
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    #[must_use]
    pub fn series_for(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }
}
