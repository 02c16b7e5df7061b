//! Nullable remote node - scripted responses, recorded submissions.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ceremony_codec::DecodedFlip;
use ceremony_rpc::{RemoteNode, RpcError};
use ceremony_types::{
    CeremonyIntervals, EpochInfo, FlipHash, FlipHashEntry, FlipPayload, SessionType,
    SubmitAnswersRequest,
};

/// Encoded payload of a small well-formed flip.
pub fn sample_flip_hex() -> String {
    DecodedFlip {
        pics: vec![vec![0xff, 0xd8], vec![0x89, 0x50], vec![1], vec![2]],
        orders: vec![vec![0, 1, 2, 3], vec![3, 2, 1, 0]],
    }
    .to_hex()
}

#[derive(Default)]
struct Script {
    epoch: Option<EpochInfo>,
    intervals: Option<CeremonyIntervals>,
    hashes: HashMap<SessionType, Vec<FlipHashEntry>>,
    flips: HashMap<FlipHash, FlipPayload>,
    fail_hashes: bool,
    fail_flips: HashSet<FlipHash>,
    fail_submit: bool,
    submit_delay: Option<Duration>,
    hash_requests: Vec<SessionType>,
    flip_requests: Vec<FlipHash>,
    submissions: Vec<(SessionType, SubmitAnswersRequest)>,
}

/// A remote node that answers from a script instead of the network.
///
/// Anything not scripted reads as "no result": the epoch and intervals calls
/// fail, hash enumeration yields `None`, and `flip_get` yields an empty payload.
#[derive(Default)]
pub struct NullRemote {
    script: Mutex<Script>,
}

impl NullRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn set_epoch(&self, epoch: EpochInfo) {
        self.script().epoch = Some(epoch);
    }

    pub fn set_intervals(&self, intervals: CeremonyIntervals) {
        self.script().intervals = Some(intervals);
    }

    pub fn set_hashes(&self, session_type: SessionType, hashes: Vec<FlipHashEntry>) {
        self.script().hashes.insert(session_type, hashes);
    }

    pub fn set_flip(&self, hash: impl Into<FlipHash>, payload: FlipPayload) {
        self.script().flips.insert(hash.into(), payload);
    }

    /// Script a ready flip carrying [`sample_flip_hex`].
    pub fn set_ready_flip(&self, hash: impl Into<FlipHash>) {
        self.set_flip(
            hash,
            FlipPayload {
                hex: Some(sample_flip_hex()),
                ready: Some(true),
                hidden: None,
            },
        );
    }

    pub fn fail_hashes(&self, fail: bool) {
        self.script().fail_hashes = fail;
    }

    pub fn fail_flip(&self, hash: impl Into<FlipHash>) {
        self.script().fail_flips.insert(hash.into());
    }

    pub fn fail_submit(&self, fail: bool) {
        self.script().fail_submit = fail;
    }

    /// Hold every submission for `delay` before answering.
    pub fn delay_submit(&self, delay: Duration) {
        self.script().submit_delay = Some(delay);
    }

    pub fn hash_requests(&self) -> Vec<SessionType> {
        self.script().hash_requests.clone()
    }

    pub fn flip_requests(&self) -> Vec<FlipHash> {
        self.script().flip_requests.clone()
    }

    pub fn submissions(&self) -> Vec<(SessionType, SubmitAnswersRequest)> {
        self.script().submissions.clone()
    }
}

fn unavailable(what: &str) -> RpcError {
    RpcError::Transport(format!("null remote: {what} unavailable"))
}

#[async_trait]
impl RemoteNode for NullRemote {
    async fn epoch(&self) -> Result<EpochInfo, RpcError> {
        self.script()
            .epoch
            .clone()
            .ok_or_else(|| RpcError::MissingResult("dna_epoch".into()))
    }

    async fn ceremony_intervals(&self) -> Result<CeremonyIntervals, RpcError> {
        self.script()
            .intervals
            .clone()
            .ok_or_else(|| RpcError::MissingResult("dna_ceremonyIntervals".into()))
    }

    async fn flip_hashes(
        &self,
        session_type: SessionType,
    ) -> Result<Option<Vec<FlipHashEntry>>, RpcError> {
        let mut script = self.script();
        script.hash_requests.push(session_type);
        if script.fail_hashes {
            return Err(unavailable("hash list"));
        }
        Ok(script.hashes.get(&session_type).cloned())
    }

    async fn flip(&self, hash: &FlipHash) -> Result<FlipPayload, RpcError> {
        let mut script = self.script();
        script.flip_requests.push(hash.clone());
        if script.fail_flips.contains(hash) {
            return Err(unavailable("flip"));
        }
        Ok(script.flips.get(hash).cloned().unwrap_or_default())
    }

    async fn submit_answers(
        &self,
        session_type: SessionType,
        request: &SubmitAnswersRequest,
    ) -> Result<serde_json::Value, RpcError> {
        let delay = self.script().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script();
        if script.fail_submit {
            return Err(unavailable("submission"));
        }
        script.submissions.push((session_type, request.clone()));
        Ok(serde_json::Value::Null)
    }
}
