//! Voxel tensor assembly.

mod assembler;
mod cube;

pub use assembler::TensorAssembler;
pub use cube::{CubeTensor, MAX_CUBE_SIZE};

use thiserror::Error;

/// Errors raised while assembling a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// The cube side is zero or too large.
    #[error("invalid cube size {0} (must be 1-65535)")]
    InvalidDimensions(usize),
    /// A frame index is outside `0..N`.
    #[error("frame index {index} is outside 0..{size}")]
    FrameOutOfRange {
        /// The rejected frame index.
        index: usize,
        /// Cube side N.
        size: usize,
    },
    /// The frame index was already ingested.
    #[error("frame {0} was already ingested")]
    DuplicateFrame(usize),
    /// A plane or raw frame has the wrong size or contents.
    #[error("invalid plane for frame {index}: {reason}")]
    InvalidPlane {
        /// Frame index of the plane.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
    /// Not every frame index was ingested.
    #[error("capture incomplete: {missing} of {size} frames missing")]
    IncompleteCapture {
        /// Frames not yet ingested.
        missing: usize,
        /// Cube side N.
        size: usize,
    },
    /// `ingest` or `finalize` was called before `start`.
    #[error("no tensor assembly in progress")]
    NotStarted,
}
