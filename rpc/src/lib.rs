//! Client side of the node RPC used by the validation session.
//!
//! The session only sees the [`RemoteNode`] trait; [`HttpRemoteNode`] is the
//! production implementation speaking JSON-RPC over HTTP.

pub mod envelope;
pub mod error;
pub mod http;
pub mod remote;

pub use envelope::{RpcRequest, RpcResponse, RpcResponseError};
pub use error::RpcError;
pub use http::HttpRemoteNode;
pub use remote::RemoteNode;
