use thiserror::Error;

use super::decode::Token;

/// Errors produced while decoding or encoding bencode.
///
/// Every error is terminal for the call that produced it. Decoding into an
/// existing destination may leave it partially populated.
#[derive(Debug, Error)]
pub enum BencodeError {
    /// A malformed token: bad digits, an unexpected byte, or a byte string
    /// whose declared length runs past the end of the input.
    #[error("syntax error at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: &'static str },

    /// An integer, list, or dictionary was never closed.
    #[error("unterminated {construct} starting at offset {offset}")]
    Unterminated {
        offset: usize,
        construct: &'static str,
    },

    /// The input ended where a token was expected.
    #[error("unexpected end of input at offset {offset}")]
    StreamExhausted { offset: usize },

    /// Bytes remain after the single top-level value.
    #[error("trailing data after value at offset {offset}")]
    TrailingData { offset: usize },

    /// The destination cannot hold the token that was found.
    #[error("type mismatch: cannot decode {found} into {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: Token,
    },

    /// A value that has no bencode representation.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),

    /// An absent value in a position that cannot be omitted.
    #[error("nil value")]
    NilValue,

    /// An unsigned value too large for the signed integer contract.
    #[error("integer {0} exceeds the signed 64-bit range")]
    IntegerOverflow(u64),

    #[error("nesting too deep")]
    NestingTooDeep,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BencodeError {
    pub(crate) fn mismatch(expected: &'static str, found: Token) -> Self {
        BencodeError::TypeMismatch { expected, found }
    }
}
