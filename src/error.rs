//! Error surface for the zlib/DEFLATE inflator.
//!
//! All variants are fatal: once `push` returns an `Err`, the `Inflator`
//! must not be pushed into again. `NeedsMore` is not an error -- it is a
//! status value returned alongside `Ok`, see [`crate::inflate::PushStatus`].

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflateError {
    #[error("truncated bitstream")]
    TruncatedBitstream,

    #[error("invalid zlib CMF method (expected 8)")]
    InvalidStreamMethod,

    #[error("invalid zlib window size exponent {0}")]
    InvalidStreamWindowSize(u8),

    #[error("invalid zlib header check bits")]
    InvalidStreamHeaderCheckBits,

    #[error("zlib stream requires a preset dictionary, which is unsupported")]
    UnexpectedStreamDictionary,

    #[error("Adler-32 checksum mismatch")]
    InvalidStreamChecksum,

    #[error("invalid DEFLATE block type (BTYPE == 3)")]
    InvalidBlockType,

    #[error("stored block LEN does not match the ones' complement of NLEN")]
    InvalidBlockElementCountParity,

    #[error("invalid HLIT run/literal symbol count {0}")]
    InvalidHuffmanRunLiteralSymbolCount(u16),

    #[error("malformed code-length Huffman table")]
    InvalidHuffmanCodelengthHuffmanTable,

    #[error("malformed code-length symbol sequence")]
    InvalidHuffmanCodelengthSequence,

    #[error("malformed run/literal or distance Huffman table")]
    InvalidHuffmanTable,

    #[error("back-reference distance exceeds the retained output window")]
    InvalidStringReference,
}

/// Errors raised by the pixel unpacker.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackError {
    #[error("the iOS (BGRA) pixel standard is not implemented")]
    UnsupportedStandard,
}
