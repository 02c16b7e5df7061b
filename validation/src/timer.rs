//! Countdown for the current validation phase.

use ceremony_types::{CeremonyIntervals, EpochInfo, EpochPeriod};
use chrono::{DateTime, TimeDelta, Utc};

/// Seconds shaved off each phase so the client moves on slightly before the
/// node's own boundary.
pub const GAP_SECS: i64 = 10;

/// Remaining seconds in the current phase, clamped to `[0, phase duration]`.
///
/// The short session ends `short` seconds after validation start; any later
/// period is measured against the end of the long session.
pub fn remaining_seconds(
    epoch: &EpochInfo,
    intervals: &CeremonyIntervals,
    now: DateTime<Utc>,
) -> u64 {
    let long = match epoch.current_period {
        EpochPeriod::ShortSession => 0,
        _ => intervals.long_session_duration,
    };
    let duration = (intervals.short_session_duration + long) as i64 - GAP_SECS;
    let finish = epoch.validation_start() + TimeDelta::seconds(duration);
    let diff = (finish - now).num_seconds();
    diff.min(duration).max(0) as u64
}

/// One-second countdown. Undefined until epoch and timing data are both known.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionTimer {
    seconds: Option<u64>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seconds(&self) -> Option<u64> {
        self.seconds
    }

    /// Recompute from scratch.
    pub fn reset(
        &mut self,
        epoch: &EpochInfo,
        intervals: &CeremonyIntervals,
        now: DateTime<Utc>,
    ) -> u64 {
        let seconds = remaining_seconds(epoch, intervals, now);
        self.seconds = Some(seconds);
        seconds
    }

    /// Advance one second. Stops at zero.
    pub fn tick(&mut self) -> Option<u64> {
        if let Some(seconds) = self.seconds.as_mut() {
            *seconds = seconds.saturating_sub(1);
        }
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        matches!(self.seconds, Some(s) if s > 0)
    }
}
