//! A streaming zlib/DEFLATE inflator paired with a PNG-style pixel
//! unpacking kernel, both built to be driven incrementally: bytes arrive
//! in whatever chunks the caller happens to have, decoded output is
//! pulled out independently, and the unpacker resolves already-decoded
//! sample bytes into fully-formed colors.

pub mod adler32;
pub mod bitstream;
pub mod error;
pub mod huffman;
pub mod inflate;
pub mod output;
pub mod pixel;

#[macro_use]
extern crate static_assertions;

pub use error::{InflateError, UnpackError};
pub use inflate::{Inflator, PushStatus};
pub use pixel::{unpack, Arity, Channel, Color, PixelFormat, Standard};

const_assert!(huffman::MAX_CODE_LEN <= 15);
