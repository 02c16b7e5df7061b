use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("malformed rlp: {0}")]
    Rlp(#[from] ::rlp::DecoderError),

    #[error("input is empty")]
    Empty,

    #[error("{0} trailing bytes after item")]
    TrailingBytes(usize),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("unexpected flip shape: {0}")]
    UnexpectedShape(&'static str),
}
