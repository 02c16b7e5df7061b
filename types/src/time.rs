//! Wall-clock abstraction.
//!
//! Countdown arithmetic is done against `chrono::DateTime<Utc>` because the node
//! reports validation start times as RFC 3339 strings.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
