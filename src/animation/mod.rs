//! Animated image (GIF89a) output.
//!
//! A cube of side N becomes an N×N animation of N frames, one per z-slice,
//! sharing a single global color table.

mod encoder;
mod inspect;
mod lzw;

pub use encoder::{
    delay_from_fps, encode, estimate_encoded_size, table_bits, AnimatedImageEncoder,
    AnimationConfig, DisposalMethod, LoopCount, GIF_SIGNATURE, GIF_TRAILER,
};
pub use inspect::{inspect, GifFrame, GifSummary};
pub use lzw::MAX_CODE_BITS;

use thiserror::Error;

/// Errors raised while encoding an animation. Nothing is emitted on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The palette cannot be written as a GIF color table.
    #[error("palette size {0} outside 2-256")]
    InvalidPaletteSize(usize),
    /// The cube side does not fit a GIF dimension.
    #[error("cube size {0} outside 1-65535")]
    InvalidSize(usize),
    /// The index buffer does not hold N³ entries.
    #[error("tensor holds {actual} indices, expected {expected}")]
    IndexCountMismatch {
        /// Voxels in the cube.
        expected: usize,
        /// Indices supplied.
        actual: usize,
    },
    /// An index points past the end of the palette.
    #[error("index {index} at position {position} exceeds palette size {palette_size}")]
    IndexOutOfRange {
        /// Offset into the index buffer.
        position: usize,
        /// The offending index.
        index: u8,
        /// Entries in the palette.
        palette_size: usize,
    },
    /// The encoder options are invalid.
    #[error("invalid encoder options: {0}")]
    InvalidOptions(String),
}

/// Errors raised while reading a GIF stream back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    /// The stream does not start with a GIF signature.
    #[error("not a GIF stream")]
    InvalidSignature,
    /// The stream ends inside a block.
    #[error("stream truncated at byte {offset}")]
    Truncated {
        /// Byte offset where input ran out.
        offset: usize,
    },
    /// A block starts with an unrecognized byte.
    #[error("unknown block 0x{tag:02X} at byte {offset}")]
    UnknownBlock {
        /// Byte offset of the block.
        offset: usize,
        /// The unrecognized introducer.
        tag: u8,
    },
    /// The LZW minimum code size is outside 2-8.
    #[error("invalid LZW minimum code size {0}")]
    InvalidCodeSize(u8),
    /// The LZW data references an undefined code.
    #[error("invalid LZW code {0}")]
    InvalidCode(u32),
    /// The LZW data stops before its end code.
    #[error("image data ended without an end code")]
    UnexpectedEnd,
    /// A frame decodes to the wrong number of pixels.
    #[error("image decoded to {actual} pixels, expected {expected}")]
    PixelCountMismatch {
        /// Pixels in the image descriptor.
        expected: usize,
        /// Pixels decoded.
        actual: usize,
    },
}
