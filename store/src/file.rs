//! JSON file store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ceremony_types::AnswerPayload;
use tracing::debug;

use crate::{PersistedValidation, StoreError, ValidationStore};

/// Keeps validation answers in a JSON document so they survive a restart.
///
/// Writes go to a sibling temp file that is then renamed over the document.
#[derive(Debug)]
pub struct FileValidationStore {
    path: PathBuf,
    cached: Mutex<PersistedValidation>,
}

impl FileValidationStore {
    /// Open the document at `path`. A missing file reads as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cached = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => PersistedValidation::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "validation store opened");
        Ok(Self {
            path,
            cached: Mutex::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, PersistedValidation>, StoreError> {
        self.cached
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn update(&self, f: impl FnOnce(&mut PersistedValidation)) -> Result<(), StoreError> {
        let mut cached = self.lock()?;
        let mut next = cached.clone();
        f(&mut next);

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&next)?)?;
        fs::rename(&tmp, &self.path)?;

        *cached = next;
        Ok(())
    }
}

impl ValidationStore for FileValidationStore {
    fn get(&self) -> Result<PersistedValidation, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn reset(&self, epoch: u64) -> Result<(), StoreError> {
        self.update(|value| {
            *value = PersistedValidation {
                epoch,
                ..PersistedValidation::default()
            }
        })
    }

    fn set_short_answers(&self, answers: &[AnswerPayload], epoch: u64) -> Result<(), StoreError> {
        self.update(|value| {
            value.answers[0] = Some(answers.to_vec());
            value.epoch = epoch;
        })
    }

    fn set_long_answers(&self, answers: &[AnswerPayload], epoch: u64) -> Result<(), StoreError> {
        self.update(|value| {
            value.answers[1] = Some(answers.to_vec());
            value.epoch = epoch;
        })
    }
}
