//! Epoch schedule types reported by the node (`dna_epoch`, `dna_ceremonyIntervals`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CeremonyError;

/// The ceremony period the network is currently in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpochPeriod {
    /// Between ceremonies.
    #[default]
    None,
    /// Flips for the upcoming ceremony are being distributed.
    FlipLottery,
    /// First, short judging phase.
    ShortSession,
    /// Second, long judging phase.
    LongSession,
    /// Judging is over; results are being computed.
    AfterLongSession,
}

impl EpochPeriod {
    /// Whether flips can be judged in this period.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ShortSession | Self::LongSession)
    }
}

/// Result of `dna_epoch`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub current_period: EpochPeriod,
    pub epoch: u64,
    pub next_validation: DateTime<Utc>,
    #[serde(default)]
    pub current_validation_start: Option<DateTime<Utc>>,
}

impl EpochInfo {
    /// Reference point for the countdown: the running validation's start time,
    /// or the next scheduled validation when no ceremony is running.
    pub fn validation_start(&self) -> DateTime<Utc> {
        match (self.current_period, self.current_validation_start) {
            (EpochPeriod::None, _) | (_, None) => self.next_validation,
            (_, Some(start)) => start,
        }
    }
}

/// Result of `dna_ceremonyIntervals`, durations in seconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CeremonyIntervals {
    pub short_session_duration: u64,
    pub long_session_duration: u64,
    #[serde(default)]
    pub flip_lottery_duration: u64,
    #[serde(default)]
    pub after_long_session_duration: u64,
}

/// Which of the two judging phases a request or payload belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Short,
    Long,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = CeremonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            _ => Err(CeremonyError::UnknownSessionType(s.to_string())),
        }
    }
}
