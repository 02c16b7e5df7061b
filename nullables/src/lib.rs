//! Nullable infrastructure for deterministic testing.
//!
//! The session reaches the outside world through two seams: the [`Clock`]
//! and the [`RemoteNode`]. This crate provides test-friendly implementations
//! of both that:
//! - Return deterministic, scripted values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.
//!
//! [`Clock`]: ceremony_types::Clock
//! [`RemoteNode`]: ceremony_rpc::RemoteNode

pub mod clock;
pub mod remote;

pub use clock::NullClock;
pub use remote::{sample_flip_hex, NullRemote};
