use ceremony_rpc::RpcError;
use ceremony_store::StoreError;
use ceremony_types::SessionType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("{0} answers already submitted or in flight")]
    SubmitSkipped(SessionType),

    #[error("validation session closed")]
    Closed,
}
