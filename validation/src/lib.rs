//! Validation session engine.
//!
//! Everything in this crate is pure: transitions take the current
//! [`ValidationState`] and an [`Action`] and return the next state plus the
//! [`Effect`]s the caller must run (fetching flips, submitting answers).
//!
//! - [`flips`]: merging fetched flips into known state, display ordering, the
//!   submit gate and extra-flip promotion.
//! - [`machine`]: the reducer.
//! - [`timer`]: remaining seconds in the current phase.
//! - [`submission`]: answer payloads and the last-second auto-submit rule.

pub mod flips;
pub mod machine;
pub mod state;
pub mod submission;
pub mod timer;

pub use flips::{can_submit, merge_flips, promote_extra_flips, reorder_flips, FlipData};
pub use machine::{reduce, Action, Effect, KnownFlip};
pub use state::{Flip, RestoredValidation, ValidationState};
pub use submission::{auto_submit_due, prepare_answers, submit_request};
pub use timer::{remaining_seconds, SessionTimer, GAP_SECS};
