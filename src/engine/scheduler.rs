//! Daily refresh scheduling.
//!
//! A [`DailyTrigger`] is polled rather than slept against: the main
//! loop wakes every few seconds and asks "is the daily fire due?".
//! Polling survives clock adjustments and long scheduler stalls — a
//! poll arriving minutes after the configured time still fires, once,
//! and missed days are not backfilled.

use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::market;

/// Fires once per IST calendar day at (or after) a fixed wall time.
#[derive(Debug)]
pub struct DailyTrigger {
    hour: u32,
    minute: u32,
    last_fired: Option<NaiveDate>,
}

impl DailyTrigger {
    /// Build against the current IST clock. A process started after
    /// today's fire time counts today as already fired — restarting
    /// the service in the evening must not refire the afternoon run.
    pub fn new(hour: u32, minute: u32) -> Self {
        Self::with_now(hour, minute, market::now_ist())
    }

    /// Construction core, taking an explicit "now".
    pub fn with_now(hour: u32, minute: u32, now: DateTime<Tz>) -> Self {
        let already_past = (now.hour(), now.minute()) >= (hour, minute);
        Self {
            hour,
            minute,
            last_fired: already_past.then(|| now.date_naive()),
        }
    }

    /// True exactly once per day, the first time a poll lands at or
    /// after the configured time.
    pub fn poll(&mut self) -> bool {
        self.poll_at(market::now_ist())
    }

    /// Polling core, taking an explicit "now".
    pub fn poll_at(&mut self, now: DateTime<Tz>) -> bool {
        let today = now.date_naive();
        if self.last_fired == Some(today) {
            return false;
        }
        let due = (now.hour(), now.minute()) >= (self.hour, self.minute);
        if due {
            self.last_fired = Some(today);
        }
        due
    }

    /// Human-readable schedule for startup logs.
    pub fn schedule_label(&self) -> String {
        format!("{:02}:{:02} IST daily", self.hour, self.minute)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
