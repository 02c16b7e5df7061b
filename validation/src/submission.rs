//! Answer submission.

use ceremony_types::{AnswerPayload, AnswerType, EpochPeriod, SessionType, SubmitAnswersRequest};

use crate::state::{Flip, ValidationState};

/// One payload entry per flip, in list order. Unanswered flips carry code 0.
pub fn prepare_answers(flips: &[Flip]) -> Vec<AnswerPayload> {
    flips
        .iter()
        .map(|flip| AnswerPayload {
            hash: flip.hash.clone(),
            answer: flip.answer.unwrap_or(AnswerType::None),
            easy: false,
        })
        .collect()
}

/// The request body the node expects. Nonce and epoch are always zero.
pub fn submit_request(answers: Vec<AnswerPayload>) -> SubmitAnswersRequest {
    SubmitAnswersRequest {
        answers,
        nonce: 0,
        epoch: 0,
    }
}

/// Last-chance submission: with one second left in the short session, send
/// whatever has been answered so far.
///
/// Only the tick value 1 qualifies, so repeated evaluation at other values
/// never triggers a second attempt.
pub fn auto_submit_due(
    seconds: Option<u64>,
    period: EpochPeriod,
    state: &ValidationState,
) -> Option<SessionType> {
    let due = seconds == Some(1)
        && period == EpochPeriod::ShortSession
        && state.has_some_answer()
        && !state.short_answers_submitted
        && !state.submitting;
    due.then_some(SessionType::Short)
}
