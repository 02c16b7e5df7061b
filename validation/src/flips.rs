//! Flip collection management.
//!
//! Fetch cycles deliver partial data: some flips are still pending on the node,
//! some arrive with an encoded payload. [`merge_flips`] folds each cycle into the
//! known list without ever touching a flip that is already resolved, and
//! [`reorder_flips`] produces the display order.

use ceremony_codec::{decode_flip_hex, CodecError, DecodedFlip};
use ceremony_types::FlipHash;
use tracing::debug;

use crate::state::Flip;

/// One flip as delivered by a fetch cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlipData {
    pub hash: FlipHash,
    pub hidden: bool,
    pub ready: bool,
    /// Encoded payload, present only when the flip was fetched.
    pub hex: Option<String>,
}

/// Merge a fetch cycle into the current flip list.
///
/// With no current flips the list is seeded from `data`. Otherwise the current
/// list keeps its membership and order; hashes only present in `data` are ignored.
pub fn merge_flips(data: &[FlipData], current: Vec<Flip>) -> Vec<Flip> {
    let current = if current.is_empty() {
        data.iter()
            .map(|item| Flip::pending(item.hash.clone(), item.hidden, false))
            .collect()
    } else {
        current
    };

    current
        .into_iter()
        .map(|flip| merge_flip(flip, data))
        .collect()
}

fn merge_flip(flip: Flip, data: &[FlipData]) -> Flip {
    if flip.is_resolved() {
        return flip;
    }
    let Some(item) = data.iter().find(|item| item.hash == flip.hash) else {
        return flip;
    };
    if !item.ready {
        return Flip::pending(item.hash.clone(), item.hidden, item.ready);
    }

    let hidden = flip.hidden || item.hidden;
    match decode_payload(item) {
        Ok(decoded) => Flip {
            ready: true,
            loaded: true,
            pics: Some(decoded.pics),
            orders: Some(decoded.orders),
            hidden,
            ..flip
        },
        Err(err) => {
            debug!(hash = %flip.hash, error = %err, "flip payload rejected");
            Flip {
                failed: true,
                ..Flip::pending(flip.hash, hidden, false)
            }
        }
    }
}

fn decode_payload(item: &FlipData) -> Result<DecodedFlip, CodecError> {
    let hex = item.hex.as_deref().ok_or(CodecError::Empty)?;
    decode_flip_hex(hex)
}

/// Stable partition into loaded, pending, failed, hidden.
///
/// A hidden flip goes to the hidden bucket whatever its other flags.
pub fn reorder_flips(flips: Vec<Flip>) -> Vec<Flip> {
    let mut ready = Vec::new();
    let mut loading = Vec::new();
    let mut failed = Vec::new();
    let mut hidden = Vec::new();

    for flip in flips {
        if flip.hidden {
            hidden.push(flip);
        } else if flip.is_loaded() {
            ready.push(flip);
        } else if flip.failed {
            failed.push(flip);
        } else {
            loading.push(flip);
        }
    }

    ready.extend(loading);
    ready.extend(failed);
    ready.extend(hidden);
    ready
}

/// Whether the submit affordance is enabled.
///
/// True when every visible, non-failed flip is answered, or when `index` has
/// reached the last visible flip.
pub fn can_submit(flips: &[Flip], index: usize) -> bool {
    let all_answered = flips
        .iter()
        .filter(|flip| !flip.hidden && !flip.failed)
        .all(Flip::has_answer);
    let visible = flips.iter().filter(|flip| !flip.hidden).count();
    all_answered || index + 1 >= visible
}

/// Give up on flips that never became ready and reveal reserve flips instead.
///
/// 1. Every flip that is not ready becomes failed.
/// 2. Hidden flips are visited in order with a budget equal to the number of
///    failed flips. A hidden flip is revealed if it is loaded and the budget is
///    positive. Every visit spends one unit of budget and counts one opened flip.
/// 3. Walking backwards, failed flips are hidden until the opened count is spent.
///
/// The opened count tracks visits, not reveals, and step 3 may spend it on
/// failed flips that were already hidden. The visible count is therefore only
/// preserved when the reserve flips are loaded and there are enough of them.
pub fn promote_extra_flips(flips: Vec<Flip>) -> Vec<Flip> {
    let mut flips: Vec<Flip> = flips
        .into_iter()
        .map(|flip| Flip {
            failed: !flip.ready,
            ..flip
        })
        .collect();

    let mut budget = flips.iter().filter(|flip| flip.failed).count() as i64;
    let mut opened = 0usize;
    for flip in flips.iter_mut().filter(|flip| flip.hidden) {
        let reveal = flip.is_loaded() && budget > 0;
        budget -= 1;
        opened += 1;
        flip.hidden = !reveal;
    }

    for flip in flips.iter_mut().rev() {
        if opened == 0 {
            break;
        }
        if flip.failed {
            opened -= 1;
            flip.hidden = true;
        }
    }

    debug!(
        failed = flips.iter().filter(|flip| flip.failed).count(),
        visible = flips.iter().filter(|flip| !flip.hidden).count(),
        "extra flips promoted"
    );
    flips
}
