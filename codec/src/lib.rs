//! Flip codec.
//!
//! A flip travels as `0x`-prefixed hex of an RLP structure with two leading
//! fields: the ordered image blobs and, per answer option, the order in which
//! those images are shown.

pub mod error;
pub mod flip;
pub mod rlp;

pub use error::CodecError;
pub use flip::{decode_flip, decode_flip_hex, DecodedFlip};
pub use crate::rlp::RlpItem;
