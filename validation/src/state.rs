//! Validation session state.

use ceremony_types::{AnswerPayload, AnswerType, EpochPeriod, FlipHash, SessionType};
use serde::{Deserialize, Serialize};

/// A flip as tracked during one phase.
///
/// Per phase a flip is in exactly one of three states: loaded (`ready && loaded`),
/// `failed`, or pending. Hidden flips stay in the list but are not judged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flip {
    pub hash: FlipHash,
    pub hidden: bool,
    /// The node reports the flip's data as available.
    pub ready: bool,
    /// The payload decoded successfully.
    pub loaded: bool,
    pub failed: bool,
    pub pics: Option<Vec<Vec<u8>>>,
    pub orders: Option<Vec<Vec<u8>>>,
    pub answer: Option<AnswerType>,
}

impl Flip {
    /// A flip whose data has not arrived yet.
    pub fn pending(hash: FlipHash, hidden: bool, ready: bool) -> Self {
        Self {
            hash,
            hidden,
            ready,
            loaded: false,
            failed: false,
            pics: None,
            orders: None,
            answer: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.ready && self.loaded
    }

    /// Loaded or failed. Resolved flips are never fetched or decoded again.
    pub fn is_resolved(&self) -> bool {
        self.is_loaded() || self.failed
    }

    pub fn has_answer(&self) -> bool {
        self.answer.is_some()
    }
}

/// Answers restored from the epoch store when a session is mounted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoredValidation {
    pub epoch: u64,
    pub short_answers: Option<Vec<AnswerPayload>>,
    pub long_answers: Option<Vec<AnswerPayload>>,
}

/// Session-wide progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationState {
    /// Epoch this progress belongs to; `None` until one is observed or restored.
    pub epoch: Option<u64>,
    /// Flips in display order.
    pub flips: Vec<Flip>,
    pub current_index: usize,
    /// A fetch cycle is outstanding.
    pub loading: bool,
    /// Every flip is loaded or failed.
    pub ready: bool,
    pub can_submit: bool,
    /// A submission for the current phase is in flight.
    pub submitting: bool,
    pub short_answers_submitted: bool,
    pub long_answers_submitted: bool,
    pub short_answers: Vec<AnswerPayload>,
    pub long_answers: Vec<AnswerPayload>,
    /// Last fetch or submission failure.
    pub error: Option<String>,
}

impl Default for ValidationState {
    fn default() -> Self {
        Self {
            epoch: None,
            flips: Vec::new(),
            current_index: 0,
            loading: true,
            ready: false,
            can_submit: false,
            submitting: false,
            short_answers_submitted: false,
            long_answers_submitted: false,
            short_answers: Vec::new(),
            long_answers: Vec::new(),
            error: None,
        }
    }
}

impl ValidationState {
    /// Back to start-of-phase defaults, keeping answers and submitted flags.
    pub(crate) fn reset_ceremony(&mut self) {
        self.flips.clear();
        self.loading = true;
        self.current_index = 0;
        self.can_submit = false;
        self.ready = false;
        self.submitting = false;
    }

    pub fn current_flip(&self) -> Option<&Flip> {
        self.flips.get(self.current_index)
    }

    pub fn visible_flips(&self) -> impl Iterator<Item = &Flip> {
        self.flips.iter().filter(|flip| !flip.hidden)
    }

    pub fn has_some_answer(&self) -> bool {
        self.flips.iter().any(Flip::has_answer)
    }

    pub fn answers_submitted(&self, session_type: SessionType) -> bool {
        match session_type {
            SessionType::Short => self.short_answers_submitted,
            SessionType::Long => self.long_answers_submitted,
        }
    }

    /// Both phases are done for this epoch.
    pub fn is_finished(&self) -> bool {
        self.short_answers_submitted && self.long_answers_submitted
    }

    /// The phase whose flips should be judged during `period`: the short
    /// session until its answers are in, the long session afterwards.
    pub fn session_type_for(&self, period: EpochPeriod) -> SessionType {
        if period == EpochPeriod::ShortSession && !self.short_answers_submitted {
            SessionType::Short
        } else {
            SessionType::Long
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_loading() {
        let state = ValidationState::default();
        assert!(state.loading);
        assert!(!state.ready);
        assert!(!state.can_submit);
        assert_eq!(state.epoch, None);
        assert!(state.current_flip().is_none());
    }

    #[test]
    fn session_type_switches_to_long_after_short_submission() {
        let mut state = ValidationState::default();
        assert_eq!(state.session_type_for(EpochPeriod::ShortSession), SessionType::Short);
        assert_eq!(state.session_type_for(EpochPeriod::LongSession), SessionType::Long);

        state.short_answers_submitted = true;
        assert_eq!(state.session_type_for(EpochPeriod::ShortSession), SessionType::Long);
    }

    #[test]
    fn resolved_means_loaded_or_failed() {
        let mut flip = Flip::pending(FlipHash::new("a"), false, true);
        assert!(!flip.is_resolved());
        flip.loaded = true;
        assert!(flip.is_resolved());

        let mut failed = Flip::pending(FlipHash::new("b"), false, false);
        failed.failed = true;
        assert!(failed.is_resolved());
        assert!(!failed.is_loaded());
    }
}
