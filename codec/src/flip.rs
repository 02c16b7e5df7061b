//! Flip payload decoding.

use crate::rlp::{self, RlpItem};
use crate::CodecError;

/// The judgeable content of a flip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedFlip {
    /// Raw image blobs in storage order.
    pub pics: Vec<Vec<u8>>,
    /// One permutation of image indices per answer option.
    pub orders: Vec<Vec<u8>>,
}

impl DecodedFlip {
    /// Encode as the `0x`-prefixed hex the node serves.
    pub fn to_hex(&self) -> String {
        let pics = self.pics.iter().cloned().map(RlpItem::Bytes).collect();
        let orders = self
            .orders
            .iter()
            .map(|order| {
                RlpItem::List(
                    order
                        .iter()
                        .map(|&idx| match idx {
                            0 => RlpItem::Bytes(Vec::new()),
                            n => RlpItem::Bytes(vec![n]),
                        })
                        .collect(),
                )
            })
            .collect();
        let root = RlpItem::List(vec![RlpItem::List(pics), RlpItem::List(orders)]);
        format!("0x{}", hex::encode(rlp::encode(&root)))
    }
}

/// Decode a flip from its hex form. A leading `0x` is optional.
pub fn decode_flip_hex(payload: &str) -> Result<DecodedFlip, CodecError> {
    let digits = payload
        .strip_prefix("0x")
        .or_else(|| payload.strip_prefix("0X"))
        .unwrap_or(payload);
    let bytes = hex::decode(digits)?;
    decode_flip(&bytes)
}

/// Decode a flip from raw RLP bytes.
///
/// Fields after the first two are ignored.
pub fn decode_flip(bytes: &[u8]) -> Result<DecodedFlip, CodecError> {
    let root = rlp::decode(bytes)?;
    let fields = root
        .as_list()
        .ok_or(CodecError::UnexpectedShape("flip is not a list"))?;
    let [pics, orders, ..] = fields else {
        return Err(CodecError::UnexpectedShape("flip needs images and orders"));
    };

    let pics = pics
        .as_list()
        .ok_or(CodecError::UnexpectedShape("images field is not a list"))?
        .iter()
        .map(|pic| {
            pic.as_bytes()
                .map(<[u8]>::to_vec)
                .ok_or(CodecError::UnexpectedShape("image is not a byte string"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let orders = orders
        .as_list()
        .ok_or(CodecError::UnexpectedShape("orders field is not a list"))?
        .iter()
        .map(decode_order)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedFlip { pics, orders })
}

// Each element is an RLP integer; the empty string stands for zero.
fn decode_order(item: &RlpItem) -> Result<Vec<u8>, CodecError> {
    item.as_list()
        .ok_or(CodecError::UnexpectedShape("order is not a list"))?
        .iter()
        .map(|element| {
            element
                .as_bytes()
                .map(|bytes| bytes.first().copied().unwrap_or(0))
                .ok_or(CodecError::UnexpectedShape("order element is not a byte string"))
        })
        .collect()
}
