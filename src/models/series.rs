//! Bounded chronological price history for one symbol.

use serde::{Deserialize, Serialize};

/// An ordered sequence of closing prices, oldest first.
///
/// The length never exceeds `capacity` (one sample per chart column) and
/// every stored value is finite; non-finite inputs are discarded at the
/// boundary so the renderer can trust the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    closes: Vec<f64>,
    capacity: usize,
}

impl PriceSeries {
    #[must_use]
    pub fn new(symbol: impl Into<String>, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            closes: Vec::new(),
            capacity,
        }
    }

    /// Builds a series from raw closes, dropping non-finite values and
    /// keeping only the newest `capacity` samples.
    #[must_use]
    pub fn from_closes(
        symbol: impl Into<String>,
        closes: impl IntoIterator<Item = f64>,
        capacity: usize,
    ) -> Self {
        let mut series = Self::new(symbol, capacity);
        for close in closes {
            series.push(close);
        }
        series
    }

    /// Appends a sample, evicting the oldest when at capacity.
    /// Non-finite values are ignored.
    pub fn push(&mut self, close: f64) {
        if !close.is_finite() || self.capacity == 0 {
            return;
        }
        if self.closes.len() == self.capacity {
            self.closes.remove(0);
        }
        self.closes.push(close);
    }

    #[must_use]
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest sample, if any.
    #[must_use]
    pub fn latest(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    /// Minimum and maximum over the stored samples.
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let first = self.closes.first()?;
        let mut min = *first;
        let mut max = *first;
        for &close in &self.closes {
            min = min.min(close);
            max = max.max(close);
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_evicts_oldest() {
        let series = PriceSeries::from_closes("AAPL", [1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(series.closes(), &[3.0, 4.0, 5.0]);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn non_finite_values_dropped() {
        let series =
            PriceSeries::from_closes("AAPL", [1.0, f64::NAN, 2.0, f64::INFINITY, 3.0], 10);
        assert_eq!(series.closes(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn min_max_over_samples() {
        let series = PriceSeries::from_closes("AAPL", [10.0, 20.0, 10.0, 20.0], 64);
        assert_eq!(series.min_max(), Some((10.0, 20.0)));
    }

    #[test]
    fn empty_series_has_no_extremes() {
        let series = PriceSeries::new("AAPL", 64);
        assert!(series.is_empty());
        assert_eq!(series.min_max(), None);
        assert_eq!(series.latest(), None);
    }

    #[test]
    fn zero_capacity_stays_empty() {
        let mut series = PriceSeries::new("AAPL", 0);
        series.push(1.0);
        assert!(series.is_empty());
    }
}
