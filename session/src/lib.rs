//! Validation session runtime.
//!
//! [`ValidationSession::start`] spawns a single event loop that owns the
//! [`ValidationState`](ceremony_validation::ValidationState). Pollers, timers
//! and effect tasks only ever talk to that loop through a channel, so every
//! transition is applied one at a time. Consumers interact through a cloneable
//! [`SessionHandle`].

pub mod config;
pub mod effects;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod session;
pub mod shutdown;

pub use config::SessionConfig;
pub use error::SessionError;
pub use metrics::SessionMetrics;
pub use scheduler::{CancelHandle, Scheduler};
pub use session::{SessionHandle, ValidationSession};
pub use shutdown::ShutdownController;
