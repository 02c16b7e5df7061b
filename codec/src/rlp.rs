//! Owned RLP trees on top of the `rlp` crate.
//!
//! Flips only use byte strings and lists. [`decode`] turns a borrowed
//! [`::rlp::Rlp`] view into an [`RlpItem`] tree, rejecting trailing bytes and
//! runaway nesting; the crate itself enforces canonical headers.

use ::rlp::{Rlp, RlpStream};

use crate::CodecError;

/// Maximum list nesting accepted by [`decode`].
pub const MAX_DEPTH: usize = 32;

/// A decoded RLP value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RlpItem]> {
        match self {
            Self::List(items) => Some(items),
            Self::Bytes(_) => None,
        }
    }
}

/// Decode exactly one top-level item; trailing bytes are an error.
pub fn decode(input: &[u8]) -> Result<RlpItem, CodecError> {
    if input.is_empty() {
        return Err(CodecError::Empty);
    }
    let rlp = Rlp::new(input);
    let total = rlp.payload_info()?.total();
    if total < input.len() {
        return Err(CodecError::TrailingBytes(input.len() - total));
    }
    to_item(&rlp, 0)
}

fn to_item(rlp: &Rlp<'_>, depth: usize) -> Result<RlpItem, CodecError> {
    if !rlp.is_list() {
        return Ok(RlpItem::Bytes(rlp.as_val::<Vec<u8>>()?));
    }
    if depth >= MAX_DEPTH {
        return Err(CodecError::TooDeep(MAX_DEPTH));
    }

    let body = rlp.payload_info()?.value_len;
    let count = rlp.item_count()?;
    let mut items = Vec::with_capacity(count);
    let mut consumed = 0;
    for index in 0..count {
        let child = rlp.at(index)?;
        consumed += child.as_raw().len();
        items.push(to_item(&child, depth + 1)?);
    }
    // item_count stops at the first undecodable child
    if consumed < body {
        return Err(CodecError::TrailingBytes(body - consumed));
    }
    Ok(RlpItem::List(items))
}

/// Encode an item in canonical form.
pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut stream = RlpStream::new();
    append(&mut stream, item);
    stream.out().to_vec()
}

fn append(stream: &mut RlpStream, item: &RlpItem) {
    match item {
        RlpItem::Bytes(bytes) => {
            stream.append(bytes);
        }
        RlpItem::List(items) => {
            stream.begin_list(items.len());
            for item in items {
                append(stream, item);
            }
        }
    }
}
