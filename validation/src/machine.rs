//! The validation state machine.
//!
//! [`reduce`] is the only place session progress changes. It never performs
//! I/O; work that needs the network is returned as [`Effect`]s and its outcome
//! comes back later as another [`Action`].

use ceremony_types::{AnswerPayload, AnswerType, FlipHash, SessionType};
use tracing::{debug, info};

use crate::flips::{can_submit, merge_flips, promote_extra_flips, reorder_flips, FlipData};
use crate::state::{Flip, RestoredValidation, ValidationState};
use crate::submission::prepare_answers;

/// A transition request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Overlay answers restored from the epoch store.
    LoadValidation(RestoredValidation),
    /// Begin a fetch cycle for the given phase.
    StartFetchFlips(SessionType),
    FetchFlipsSucceeded {
        data: Vec<FlipData>,
        session_type: SessionType,
    },
    /// The cycle failed; the next poll retries.
    FetchFlipsFailed { error: String },
    /// Jump to a flip. The index is not bounds-checked.
    Pick(usize),
    Next,
    Prev,
    Answer(AnswerType),
    /// Mark the current flip inappropriate and move on.
    ReportAbuse,
    /// Stop waiting for unavailable flips and reveal reserve flips.
    ShowExtraFlips,
    /// Send the current answers for a phase.
    SubmitAnswers {
        session_type: SessionType,
        epoch: u64,
    },
    SubmitShortAnswers {
        answers: Vec<AnswerPayload>,
        epoch: u64,
    },
    SubmitLongAnswers {
        answers: Vec<AnswerPayload>,
        epoch: u64,
    },
    SubmitFailed {
        session_type: SessionType,
        error: String,
    },
    /// The node moved on to the other phase; drop flips fetched for the
    /// previous one.
    EnterPhase(SessionType),
    /// A new epoch has begun.
    ResetEpoch(u64),
}

/// What a fetch cycle needs to know about a flip already in state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownFlip {
    pub hash: FlipHash,
    pub hidden: bool,
    pub ready: bool,
    pub resolved: bool,
}

impl From<&Flip> for KnownFlip {
    fn from(flip: &Flip) -> Self {
        Self {
            hash: flip.hash.clone(),
            hidden: flip.hidden,
            ready: flip.ready,
            resolved: flip.is_resolved(),
        }
    }
}

/// Side effects requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Enumerate the phase's flips and fetch every one that still needs data.
    FetchFlips {
        session_type: SessionType,
        known: Vec<KnownFlip>,
    },
    /// Submit a prepared answer batch.
    SubmitAnswers {
        session_type: SessionType,
        answers: Vec<AnswerPayload>,
        epoch: u64,
    },
}

/// Apply `action` to `state`.
pub fn reduce(mut state: ValidationState, action: Action) -> (ValidationState, Vec<Effect>) {
    let mut effects = Vec::new();

    match action {
        Action::LoadValidation(restored) => {
            state.epoch = Some(restored.epoch);
            if let Some(answers) = restored.short_answers {
                state.short_answers = answers;
                state.short_answers_submitted = true;
            }
            if let Some(answers) = restored.long_answers {
                state.long_answers = answers;
                state.long_answers_submitted = true;
            }
        }
        Action::StartFetchFlips(session_type) => {
            state.loading = true;
            effects.push(Effect::FetchFlips {
                session_type,
                known: state.flips.iter().map(KnownFlip::from).collect(),
            });
        }
        Action::FetchFlipsSucceeded { data, session_type } => {
            let mut flips = merge_flips(&data, std::mem::take(&mut state.flips));
            if session_type == SessionType::Long {
                for flip in &mut flips {
                    flip.hidden = !flip.ready;
                }
            }
            state.flips = reorder_flips(flips);
            state.ready = state.flips.iter().all(|flip| flip.ready || flip.failed);
            state.loading = false;
            state.error = None;
            debug!(
                %session_type,
                flips = state.flips.len(),
                ready = state.ready,
                "fetch cycle merged"
            );
        }
        Action::FetchFlipsFailed { error } => {
            state.loading = true;
            state.error = Some(error);
        }
        Action::Pick(index) => {
            state.current_index = index;
            state.can_submit = can_submit(&state.flips, index);
        }
        Action::Next => {
            let last = state.flips.len().saturating_sub(1);
            state.current_index = (state.current_index + 1).min(last);
            state.can_submit = can_submit(&state.flips, state.current_index);
        }
        Action::Prev => {
            state.current_index = state.current_index.saturating_sub(1);
            state.can_submit = can_submit(&state.flips, state.current_index);
        }
        Action::Answer(option) => {
            if let Some(flip) = state.flips.get_mut(state.current_index) {
                flip.answer = Some(option);
            }
            state.can_submit = can_submit(&state.flips, state.current_index);
        }
        Action::ReportAbuse => {
            if let Some(flip) = state.flips.get_mut(state.current_index) {
                flip.answer = Some(AnswerType::Inappropriate);
            }
            let last_visible = state.visible_flips().count().saturating_sub(1);
            state.current_index = (state.current_index + 1).min(last_visible);
            state.can_submit = can_submit(&state.flips, state.current_index);
        }
        Action::ShowExtraFlips => {
            let flips = promote_extra_flips(std::mem::take(&mut state.flips));
            state.can_submit = can_submit(&flips, state.current_index);
            state.flips = reorder_flips(flips);
            state.ready = true;
        }
        Action::SubmitAnswers {
            session_type,
            epoch,
        } => {
            if state.answers_submitted(session_type) || state.submitting {
                debug!(%session_type, "submission skipped, already sent or in flight");
            } else {
                state.submitting = true;
                effects.push(Effect::SubmitAnswers {
                    session_type,
                    answers: prepare_answers(&state.flips),
                    epoch,
                });
            }
        }
        Action::SubmitShortAnswers { answers, epoch } => {
            info!(epoch, answers = answers.len(), "short answers submitted");
            state.short_answers = answers;
            state.epoch = Some(epoch);
            state.short_answers_submitted = true;
            state.reset_ceremony();
        }
        Action::SubmitLongAnswers { answers, epoch } => {
            info!(epoch, answers = answers.len(), "long answers submitted");
            state.long_answers = answers;
            state.epoch = Some(epoch);
            state.long_answers_submitted = true;
            state.reset_ceremony();
        }
        Action::SubmitFailed {
            session_type,
            error,
        } => {
            debug!(%session_type, %error, "submission failed");
            state.submitting = false;
            state.error = Some(error);
        }
        Action::EnterPhase(session_type) => {
            info!(%session_type, "validation phase changed, flips cleared");
            state.reset_ceremony();
        }
        Action::ResetEpoch(epoch) => {
            info!(epoch, "epoch changed, validation progress reset");
            state.short_answers.clear();
            state.long_answers.clear();
            state.epoch = Some(epoch);
            state.short_answers_submitted = false;
            state.long_answers_submitted = false;
            state.error = None;
            state.reset_ceremony();
        }
    }

    (state, effects)
}

impl ValidationState {
    /// Apply `action` in place, returning the effects to run.
    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        let (next, effects) = reduce(std::mem::take(self), action);
        *self = next;
        effects
    }
}
