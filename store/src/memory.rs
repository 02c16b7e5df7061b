//! Process-lifetime store.

use std::sync::{Mutex, MutexGuard};

use ceremony_types::AnswerPayload;

use crate::{PersistedValidation, StoreError, ValidationStore};

/// Keeps validation answers in memory for as long as the process runs.
#[derive(Debug, Default)]
pub struct MemoryValidationStore {
    inner: Mutex<PersistedValidation>,
}

impl MemoryValidationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_value(value: PersistedValidation) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PersistedValidation>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl ValidationStore for MemoryValidationStore {
    fn get(&self) -> Result<PersistedValidation, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn reset(&self, epoch: u64) -> Result<(), StoreError> {
        *self.lock()? = PersistedValidation {
            epoch,
            ..PersistedValidation::default()
        };
        Ok(())
    }

    fn set_short_answers(&self, answers: &[AnswerPayload], epoch: u64) -> Result<(), StoreError> {
        let mut value = self.lock()?;
        value.answers[0] = Some(answers.to_vec());
        value.epoch = epoch;
        Ok(())
    }

    fn set_long_answers(&self, answers: &[AnswerPayload], epoch: u64) -> Result<(), StoreError> {
        let mut value = self.lock()?;
        value.answers[1] = Some(answers.to_vec());
        value.epoch = epoch;
        Ok(())
    }
}
