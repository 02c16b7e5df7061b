//! Remote work requested by the state machine.

use ceremony_rpc::{RemoteNode, RpcError};
use ceremony_types::{AnswerPayload, FlipHashEntry, SessionType};
use ceremony_validation::{submit_request, FlipData, KnownFlip};
use futures_util::future::try_join_all;
use tracing::debug;

/// One fetch cycle: enumerate the phase's hashes, then fetch every flip that
/// still needs data, all at once.
///
/// Resolved flips are echoed back from `known` without a request. Unknown
/// flips the node has not made ready yet become placeholders. A node that
/// answers the enumeration without a result fails the cycle, as does any
/// single failed `flip_get`.
pub async fn fetch_flips(
    remote: &dyn RemoteNode,
    session_type: SessionType,
    known: &[KnownFlip],
) -> Result<Vec<FlipData>, RpcError> {
    let hashes = remote
        .flip_hashes(session_type)
        .await?
        .ok_or_else(|| RpcError::MissingResult(format!("{session_type} flip hashes")))?;

    try_join_all(hashes.into_iter().map(|entry| fetch_one(remote, known, entry))).await
}

async fn fetch_one(
    remote: &dyn RemoteNode,
    known: &[KnownFlip],
    entry: FlipHashEntry,
) -> Result<FlipData, RpcError> {
    match known.iter().find(|flip| flip.hash == entry.hash) {
        Some(flip) if flip.resolved => {
            return Ok(FlipData {
                hash: flip.hash.clone(),
                hidden: flip.hidden,
                ready: flip.ready,
                hex: None,
            });
        }
        None if !entry.ready => {
            return Ok(FlipData {
                hash: entry.hash,
                hidden: entry.extra,
                ready: false,
                hex: None,
            });
        }
        _ => {}
    }

    let payload = remote.flip(&entry.hash).await?;
    debug!(hash = %entry.hash, has_hex = payload.hex.is_some(), "flip fetched");
    Ok(FlipData {
        hidden: payload.hidden.unwrap_or(entry.extra),
        ready: payload.ready.unwrap_or(entry.ready),
        hex: payload.hex,
        hash: entry.hash,
    })
}

/// Send a prepared batch. The node always receives nonce and epoch 0.
pub async fn submit_answers(
    remote: &dyn RemoteNode,
    session_type: SessionType,
    answers: Vec<AnswerPayload>,
) -> Result<(), RpcError> {
    let request = submit_request(answers);
    remote.submit_answers(session_type, &request).await?;
    Ok(())
}
