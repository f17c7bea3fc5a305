//! Trading-day resolution for the NYSE schedule.
//!
//! Weekends are excluded by date arithmetic alone; holidays and other
//! closures are discovered through a [`MarketProbe`], normally backed by a
//! data provider. Probe failures degrade softly: a day that cannot be
//! confirmed is treated as non-trading and the walk continues, bounded by
//! [`MAX_LOOKBACK_DAYS`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::fetch::FetchError;
use crate::models::MarketWindow;

/// Hard bound on the walk-back from a candidate date.
///
/// No real exchange closes for more than a few consecutive days, so a
/// walk that exhausts this many candidates indicates a broken probe
/// rather than an actual market outage.
pub const MAX_LOOKBACK_DAYS: u32 = 10;

/// Regular session open, local exchange time.
const SESSION_OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
/// Regular session close, local exchange time.
const SESSION_CLOSE: NaiveTime = NaiveTime::from_hms_opt(16, 0, 0).unwrap();

/// How long a fallback window stays valid before re-probing.
const FALLBACK_REEVALUATION: Duration = Duration::from_secs(30 * 60);
/// Slack added past a session boundary before re-probing, so the
/// boundary has definitely passed when the window is recomputed.
const BOUNDARY_BUFFER: Duration = Duration::from_secs(60);

/// Calendar-specific failures.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The walk-back ran out of candidates without finding a trading day.
    #[error("no trading day found within {days} days before {from}")]
    LookbackExhausted { from: NaiveDate, days: u32 },
}

/// Whether the exchange is currently trading and how long until that
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeStatus {
    pub is_open: bool,
    pub time_to_boundary: Duration,
}

/// Source of truth for holidays and live session state.
#[async_trait]
pub trait MarketProbe: Send + Sync {
    /// Whether the exchange held (or is holding) a session on `day`.
    /// Weekends are filtered out before this is called.
    async fn is_trading_day(&self, day: NaiveDate) -> Result<bool, FetchError>;

    /// Current open/closed state and time until the next boundary.
    async fn exchange_status(&self, now: DateTime<Utc>) -> Result<ExchangeStatus, FetchError>;
}

/// Probe that treats every weekday as a trading day.
///
/// Ignores holidays, which only costs a cycle of empty data on the few
/// days a year the exchange closes midweek. Used in demo mode and as the
/// arithmetic behind [`MarketCalendar::fallback_window`].
#[derive(Debug, Clone, Copy)]
pub struct WeekdayProbe {
    tz: Tz,
}

impl WeekdayProbe {
    #[must_use]
    pub fn nyse() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
        }
    }
}

#[async_trait]
impl MarketProbe for WeekdayProbe {
    async fn is_trading_day(&self, day: NaiveDate) -> Result<bool, FetchError> {
        Ok(!is_weekend(day))
    }

    async fn exchange_status(&self, now: DateTime<Utc>) -> Result<ExchangeStatus, FetchError> {
        let local = now.with_timezone(&self.tz);
        Ok(session_status(now, self.tz, !is_weekend(local.date_naive())))
    }
}

/// Computes open/closed state from the wall clock in `tz`.
///
/// `trading_today` says whether today has a session at all; when it does
/// not, the boundary is taken as the next day's open.
#[must_use]
pub fn session_status(now: DateTime<Utc>, tz: Tz, trading_today: bool) -> ExchangeStatus {
    let local = now.with_timezone(&tz);
    let today = local.date_naive();
    let time = local.time();

    let is_open = trading_today && time >= SESSION_OPEN && time < SESSION_CLOSE;
    let boundary = if is_open {
        local_datetime(tz, today, SESSION_CLOSE)
    } else if trading_today && time < SESSION_OPEN {
        local_datetime(tz, today, SESSION_OPEN)
    } else {
        local_datetime(tz, today + TimeDelta::days(1), SESSION_OPEN)
    };

    let time_to_boundary = (boundary - now)
        .to_std()
        .unwrap_or(Duration::from_secs(60));
    ExchangeStatus {
        is_open,
        time_to_boundary,
    }
}

/// Resolves trading days and market windows for one exchange.
pub struct MarketCalendar {
    tz: Tz,
    probe: Arc<dyn MarketProbe>,
}

impl MarketCalendar {
    #[must_use]
    pub fn nyse(probe: Arc<dyn MarketProbe>) -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            probe,
        }
    }

    /// The trading day whose data should be on display at `now`.
    ///
    /// Before the session open, today's session has not produced data
    /// yet, so the walk starts from yesterday.
    pub async fn current_trading_day(&self, now: DateTime<Utc>) -> crate::Result<NaiveDate> {
        let local = now.with_timezone(&self.tz);
        let mut candidate = local.date_naive();
        if local.time() < SESSION_OPEN {
            candidate -= TimeDelta::days(1);
        }
        self.walk_back(candidate).await
    }

    /// The last trading day strictly before `day`.
    pub async fn previous_trading_day(&self, day: NaiveDate) -> crate::Result<NaiveDate> {
        self.walk_back(day - TimeDelta::days(1)).await
    }

    /// Resolves the full market window at `now`.
    ///
    /// A failed status probe degrades to a closed window that is
    /// re-evaluated after [`FALLBACK_REEVALUATION`].
    pub async fn market_window(&self, now: DateTime<Utc>) -> crate::Result<MarketWindow> {
        let trading_day = self.current_trading_day(now).await?;
        let previous_trading_day = self.previous_trading_day(trading_day).await?;

        let (is_open, revalidate_in) = match self.probe.exchange_status(now).await {
            Ok(status) => (status.is_open, status.time_to_boundary + BOUNDARY_BUFFER),
            Err(e) => {
                warn!(error = %e, "exchange status probe failed, assuming closed");
                (false, FALLBACK_REEVALUATION)
            }
        };

        let next_reevaluation = now
            + TimeDelta::from_std(revalidate_in)
                .unwrap_or_else(|_| TimeDelta::seconds(FALLBACK_REEVALUATION.as_secs() as i64));

        debug!(%trading_day, %previous_trading_day, is_open, "market window resolved");
        Ok(MarketWindow {
            trading_day,
            previous_trading_day,
            is_open,
            next_reevaluation,
        })
    }

    /// Weekend-arithmetic-only window for when no probe calls should be
    /// made yet, such as the first cycle at startup.
    #[must_use]
    pub fn fallback_window(&self, now: DateTime<Utc>) -> MarketWindow {
        let local = now.with_timezone(&self.tz);
        let mut trading_day = local.date_naive();
        if local.time() < SESSION_OPEN {
            trading_day -= TimeDelta::days(1);
        }
        while is_weekend(trading_day) {
            trading_day -= TimeDelta::days(1);
        }
        let mut previous_trading_day = trading_day - TimeDelta::days(1);
        while is_weekend(previous_trading_day) {
            previous_trading_day -= TimeDelta::days(1);
        }
        MarketWindow {
            trading_day,
            previous_trading_day,
            is_open: false,
            next_reevaluation: now
                + TimeDelta::seconds(FALLBACK_REEVALUATION.as_secs() as i64),
        }
    }

    async fn walk_back(&self, from: NaiveDate) -> crate::Result<NaiveDate> {
        let mut candidate = from;
        for _ in 0..=MAX_LOOKBACK_DAYS {
            if is_weekend(candidate) {
                candidate -= TimeDelta::days(1);
                continue;
            }
            match self.probe.is_trading_day(candidate).await {
                Ok(true) => return Ok(candidate),
                Ok(false) => {}
                Err(e) => {
                    warn!(day = %candidate, error = %e, "trading-day probe failed, skipping");
                }
            }
            candidate -= TimeDelta::days(1);
        }
        Err(ScheduleError::LookbackExhausted {
            from,
            days: MAX_LOOKBACK_DAYS,
        }
        .into())
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

fn local_datetime(tz: Tz, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    // DST gaps never fall on session boundaries; earliest() covers folds.
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
