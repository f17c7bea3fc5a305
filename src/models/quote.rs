//! Current trade state for a single symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A symbol's price, change, and change-percent at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    /// Absolute change versus the prior close.
    pub change: f64,
    /// Change as a percentage of the prior close.
    pub change_percent: f64,
    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    #[must_use]
    pub fn new(symbol: impl Into<String>, price: f64, change: f64, change_percent: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change,
            change_percent,
            fetched_at: Utc::now(),
        }
    }

    /// The reference price this quote's change is measured against.
    ///
    /// Used as the chart inflection value: columns at or above it draw
    /// green, below it red.
    #[must_use]
    pub fn prior_close(&self) -> f64 {
        self.price - self.change
    }

    /// `true` when the symbol is flat or up on the day.
    #[must_use]
    pub fn is_gain(&self) -> bool {
        self.change >= 0.0
    }
}
