//! Nullable clock - deterministic time for testing.

use std::sync::Mutex;

use ceremony_types::Clock;
use chrono::{DateTime, TimeDelta, Utc};

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to.
#[derive(Debug)]
pub struct NullClock {
    current: Mutex<DateTime<Utc>>,
}

impl NullClock {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: i64) {
        let mut current = self.current.lock().unwrap();
        *current += TimeDelta::seconds(secs);
    }

    /// Set the time to a specific value.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.current.lock().unwrap() = at;
    }
}

impl Clock for NullClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }
}
