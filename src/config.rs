//! Environment-driven configuration.
//!
//! Everything is read once at startup from `TICKER_*` variables, with
//! sensible defaults so the binary runs out of the box in demo mode or
//! against Yahoo's keyless endpoints.

use std::env;
use std::time::Duration;

use tracing::info;

use crate::TickerError;

const DEFAULT_SYMBOLS: &str = "AAPL,GOOGL,MSFT,TSLA";
const DEFAULT_REFRESH_MINUTES: u64 = 5;
const DEFAULT_DISPLAY_SECONDS: u64 = 10;
const DEFAULT_TRENDING_COUNT: usize = 3;

/// Runtime configuration, fully resolved.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Symbols to rotate through, uppercase, deduplicated.
    pub symbols: Vec<String>,
    /// Minutes between fetch cycles.
    pub refresh_minutes: u64,
    /// Seconds each symbol stays on screen.
    pub display_seconds: u64,
    /// Use synthetic data only, no network.
    pub demo_mode: bool,
    /// Merge trending symbols into the rotation.
    pub include_trending: bool,
    /// How many trending symbols to request.
    pub trending_count: usize,
    /// Alpha Vantage key; enables the secondary provider when set.
    pub provider_api_key: Option<String>,
}

impl AppConfig {
    #[must_use]
    pub fn display_interval(&self) -> Duration {
        Duration::from_secs(self.display_seconds)
    }
}

/// Reads configuration from the environment.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let symbols = parse_symbols(
        &non_empty_var("TICKER_SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()),
    )?;
    let refresh_minutes = parse_positive("TICKER_REFRESH_MINUTES", DEFAULT_REFRESH_MINUTES)?;
    let display_seconds = parse_positive("TICKER_DISPLAY_SECONDS", DEFAULT_DISPLAY_SECONDS)?;
    let demo_mode = parse_flag("TICKER_DEMO_MODE")?;
    let include_trending = parse_flag("TICKER_INCLUDE_TRENDING")?;
    let trending_count =
        parse_positive("TICKER_TRENDING_COUNT", DEFAULT_TRENDING_COUNT as u64)? as usize;
    let provider_api_key = non_empty_var("ALPHA_VANTAGE_API_KEY");

    let config = AppConfig {
        symbols,
        refresh_minutes,
        display_seconds,
        demo_mode,
        include_trending,
        trending_count,
        provider_api_key,
    };
    info!(
        symbols = ?config.symbols,
        refresh_minutes = config.refresh_minutes,
        demo_mode = config.demo_mode,
        has_api_key = config.provider_api_key.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

/// A set variable with non-whitespace content, or `None`.
fn non_empty_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Splits a comma-separated symbol list, uppercased and deduplicated.
fn parse_symbols(raw: &str) -> crate::Result<Vec<String>> {
    let mut symbols = Vec::new();
    for part in raw.split(',') {
        let symbol = part.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        return Err(TickerError::Config(format!(
            "TICKER_SYMBOLS contains no symbols: {raw:?}"
        )));
    }
    Ok(symbols)
}

fn parse_positive(name: &str, default: u64) -> crate::Result<u64> {
    let Some(raw) = non_empty_var(name) else {
        return Ok(default);
    };
    let value: u64 = raw
        .parse()
        .map_err(|_| TickerError::Config(format!("{name} is not a number: {raw:?}")))?;
    if value == 0 {
        return Err(TickerError::Config(format!("{name} must be at least 1")));
    }
    Ok(value)
}

fn parse_flag(name: &str) -> crate::Result<bool> {
    match non_empty_var(name) {
        None => Ok(false),
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(TickerError::Config(format!(
                "{name} is not a boolean: {raw:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (name, value) in vars {
            match value {
                // SAFETY: guarded by ENV_LOCK, no concurrent env access.
                Some(v) => unsafe { env::set_var(name, v) },
                None => unsafe { env::remove_var(name) },
            }
        }
        f();
        for (name, _) in vars {
            // SAFETY: guarded by ENV_LOCK, no concurrent env access.
            unsafe { env::remove_var(name) };
        }
    }

    const ALL_VARS: [(&str, Option<&str>); 7] = [
        ("TICKER_SYMBOLS", None),
        ("TICKER_REFRESH_MINUTES", None),
        ("TICKER_DISPLAY_SECONDS", None),
        ("TICKER_DEMO_MODE", None),
        ("TICKER_INCLUDE_TRENDING", None),
        ("TICKER_TRENDING_COUNT", None),
        ("ALPHA_VANTAGE_API_KEY", None),
    ];

    #[test]
    fn defaults_apply_with_empty_environment() {
        with_env(&ALL_VARS, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.symbols, ["AAPL", "GOOGL", "MSFT", "TSLA"]);
            assert_eq!(config.refresh_minutes, 5);
            assert_eq!(config.display_seconds, 10);
            assert!(!config.demo_mode);
            assert!(!config.include_trending);
            assert_eq!(config.trending_count, 3);
            assert!(config.provider_api_key.is_none());
        });
    }

    #[test]
    fn symbols_are_normalized() {
        let mut vars = ALL_VARS;
        vars[0] = ("TICKER_SYMBOLS", Some(" aapl, tsla ,AAPL,, gme "));
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.symbols, ["AAPL", "TSLA", "GME"]);
        });
    }

    #[test]
    fn empty_symbol_list_is_rejected() {
        let mut vars = ALL_VARS;
        vars[0] = ("TICKER_SYMBOLS", Some(" , ,"));
        with_env(&vars, || {
            assert!(matches!(fetch_config(), Err(TickerError::Config(_))));
        });
    }

    #[test]
    fn zero_refresh_is_rejected() {
        let mut vars = ALL_VARS;
        vars[1] = ("TICKER_REFRESH_MINUTES", Some("0"));
        with_env(&vars, || {
            assert!(matches!(fetch_config(), Err(TickerError::Config(_))));
        });
    }

    #[test]
    fn flags_and_key_parse() {
        let mut vars = ALL_VARS;
        vars[3] = ("TICKER_DEMO_MODE", Some("true"));
        vars[4] = ("TICKER_INCLUDE_TRENDING", Some("1"));
        vars[6] = ("ALPHA_VANTAGE_API_KEY", Some("demo-key"));
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert!(config.demo_mode);
            assert!(config.include_trending);
            assert_eq!(config.provider_api_key.as_deref(), Some("demo-key"));
        });
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut vars = ALL_VARS;
        vars[2] = ("TICKER_DISPLAY_SECONDS", Some("soon"));
        with_env(&vars, || {
            assert!(matches!(fetch_config(), Err(TickerError::Config(_))));
        });
    }
}
