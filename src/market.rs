//! Exchange clock helpers for the Indian market.
//!
//! Market status is a pure function of the IST wall clock against the
//! NSE session (09:15–15:30, Monday–Friday) — computed on demand and
//! never cached. Also holds the IST formatting used for "Last Updated"
//! display strings.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

/// Whether the exchange is currently trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Open,
    Closed,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Open => write!(f, "OPEN"),
            MarketStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Current IST wall-clock time.
pub fn now_ist() -> DateTime<Tz> {
    Utc::now().with_timezone(&Kolkata)
}

/// Market status at a given IST instant.
///
/// The session runs 09:15–15:30; the 15:30 minute itself still counts
/// as open. Weekends are always closed. Exchange holidays are not
/// modelled.
pub fn market_status_at(t: DateTime<Tz>) -> MarketStatus {
    let weekday_ok = matches!(
        t.weekday(),
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri
    );
    let (hour, minute) = (t.hour(), t.minute());
    let session_ok = (hour == 9 && minute >= 15)
        || (hour > 9 && hour < 15)
        || (hour == 15 && minute <= 30);

    if weekday_ok && session_ok {
        MarketStatus::Open
    } else {
        MarketStatus::Closed
    }
}

/// Market status right now.
pub fn current_market_status() -> MarketStatus {
    market_status_at(now_ist())
}

/// Render a UTC instant as an IST display string.
pub fn format_ist(t: DateTime<Utc>) -> String {
    t.with_timezone(&Kolkata)
        .format("%d %b %Y, %H:%M:%S IST")
        .to_string()
}
