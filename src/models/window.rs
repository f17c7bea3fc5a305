//! Trading-session window resolved from the market calendar.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The trading context a fetch cycle operates in.
///
/// `trading_day` is the most recent day with a session (today while the
/// market is open, otherwise the last completed one) and
/// `previous_trading_day` the session before it, used as the chart's
/// comparison baseline. The window stays valid until `next_reevaluation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketWindow {
    pub trading_day: NaiveDate,
    pub previous_trading_day: NaiveDate,
    pub is_open: bool,
    pub next_reevaluation: DateTime<Utc>,
}
