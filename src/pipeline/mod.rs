//! Session orchestration.
//!
//! Wires the capture source, palette builder, ditherer, tensor assembler
//! and animation encoder into one cancellable run.

mod cancel;
mod report;
mod session;

pub use cancel::CancelToken;
pub use report::{SessionProgress, SessionReport, Stage};
pub use session::{CubeSession, SessionOutput};

use thiserror::Error;

use crate::animation::EncodingError;
use crate::capture::{CameraError, ConfigError};
use crate::codec::SpoolError;
use crate::dither::{DitherError, MaskError};
use crate::palette::PaletteError;
use crate::tensor::AssemblyError;

/// Any failure of a session run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The capture source failed.
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    /// A frame could not be spooled or restored.
    #[error("frame spool error: {0}")]
    Spool(#[from] SpoolError),
    /// The palette could not be built.
    #[error("palette error: {0}")]
    Palette(#[from] PaletteError),
    /// A frame could not be dithered.
    #[error("dither error: {0}")]
    Dither(#[from] DitherError),
    /// The mask could not be generated.
    #[error("mask error: {0}")]
    Mask(#[from] MaskError),
    /// The cube could not be assembled.
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),
    /// The cube could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// A frame buffer does not match its side length.
    #[error("frame {index} holds {actual} bytes, expected {expected}")]
    InvalidFrame {
        /// Frame index.
        index: usize,
        /// Bytes for an N×N RGBA frame.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// The run was cancelled through its token.
    #[error("session cancelled")]
    Cancelled,
}
