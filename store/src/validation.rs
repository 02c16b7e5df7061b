//! Validation store trait.

use ceremony_types::AnswerPayload;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// What is kept between session mounts: the epoch the answers belong to and
/// the submitted payload of each phase, short first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedValidation {
    pub epoch: u64,
    #[serde(default)]
    pub answers: [Option<Vec<AnswerPayload>>; 2],
}

impl PersistedValidation {
    pub fn short_answers(&self) -> Option<&[AnswerPayload]> {
        self.answers[0].as_deref()
    }

    pub fn long_answers(&self) -> Option<&[AnswerPayload]> {
        self.answers[1].as_deref()
    }
}

/// Trait for storing per-epoch validation answers.
pub trait ValidationStore: Send + Sync {
    fn get(&self) -> Result<PersistedValidation, StoreError>;

    /// Start a new epoch, dropping answers of the previous one.
    fn reset(&self, epoch: u64) -> Result<(), StoreError>;

    fn set_short_answers(&self, answers: &[AnswerPayload], epoch: u64) -> Result<(), StoreError>;

    fn set_long_answers(&self, answers: &[AnswerPayload], epoch: u64) -> Result<(), StoreError>;
}
