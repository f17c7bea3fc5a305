//! Crate-level error types.
//!
//! [`TickerError`] unifies every error source (configuration, data
//! fetching, trading-calendar computation, terminal I/O) behind a single
//! enum so callers can match on the variant they care about while still
//! using the `?` operator for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TickerError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    /// A configuration value is missing, malformed, or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A data-provider request failed past the end of the fallback chain.
    #[error(transparent)]
    Fetch(#[from] crate::fetch::FetchError),

    /// The trading-calendar computation could not produce a valid window.
    #[error(transparent)]
    Schedule(#[from] crate::calendar::ScheduleError),

    /// Terminal or other I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
