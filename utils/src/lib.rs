//! Shared utilities for the validation ceremony crates.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
pub use time::{format_countdown, format_duration};
