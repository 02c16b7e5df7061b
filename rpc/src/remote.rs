use async_trait::async_trait;
use ceremony_types::{
    CeremonyIntervals, EpochInfo, FlipHash, FlipHashEntry, FlipPayload, SessionType,
    SubmitAnswersRequest,
};

use crate::RpcError;

/// The node operations a validation session needs.
#[async_trait]
pub trait RemoteNode: Send + Sync {
    /// `dna_epoch`
    async fn epoch(&self) -> Result<EpochInfo, RpcError>;

    /// `dna_ceremonyIntervals`
    async fn ceremony_intervals(&self) -> Result<CeremonyIntervals, RpcError>;

    /// `flip_shortHashes` / `flip_longHashes`. `None` when the node answered
    /// without a result, which happens before the hash list is assigned.
    async fn flip_hashes(
        &self,
        session_type: SessionType,
    ) -> Result<Option<Vec<FlipHashEntry>>, RpcError>;

    /// `flip_get`. A missing result yields an empty payload, which later
    /// fails to decode.
    async fn flip(&self, hash: &FlipHash) -> Result<FlipPayload, RpcError>;

    /// `flip_submitShortAnswers` / `flip_submitLongAnswers`.
    async fn submit_answers(
        &self,
        session_type: SessionType,
        request: &SubmitAnswersRequest,
    ) -> Result<serde_json::Value, RpcError>;
}
