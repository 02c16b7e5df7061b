//! Storage for validation progress that must survive a session remount.
//!
//! The session depends only on the [`ValidationStore`] trait. Two backends are
//! provided: [`MemoryValidationStore`] lives as long as the process,
//! [`FileValidationStore`] keeps a small JSON document on disk.

pub mod error;
pub mod file;
pub mod memory;
pub mod validation;

pub use error::StoreError;
pub use file::FileValidationStore;
pub use memory::MemoryValidationStore;
pub use validation::{PersistedValidation, ValidationStore};
