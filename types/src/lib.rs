//! Fundamental types for the validation ceremony.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! epoch periods and timing, flip identifiers, answer codes, the submission wire
//! payload, and the clock abstraction.

pub mod answer;
pub mod epoch;
pub mod error;
pub mod flip;
pub mod time;

pub use answer::{AnswerPayload, AnswerType, SubmitAnswersRequest};
pub use epoch::{CeremonyIntervals, EpochInfo, EpochPeriod, SessionType};
pub use error::CeremonyError;
pub use flip::{FlipHash, FlipHashEntry, FlipPayload};
pub use time::{Clock, SystemClock};
