//! Spatiotemporal blue-noise dithering.
//!
//! Each pixel is mapped to a palette entry after a small mask-driven
//! lightness perturbation, with an optional stylized swap to the entry's
//! complementary partner. The mask and palette are built before any frame
//! is dithered and shared read-only afterwards.

mod ditherer;
mod mask;

pub use ditherer::{DitherConfig, Ditherer};
pub use mask::{BlueNoiseMask, MaskConfig, MaskError};

use thiserror::Error;

/// Errors raised while dithering.
#[derive(Debug, Error)]
pub enum DitherError {
    /// The frame buffer does not match its side length.
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    InvalidFrame {
        /// Bytes for an N×N RGBA frame.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// Amplitude or style weight is invalid.
    #[error("invalid dither configuration: {0}")]
    InvalidConfig(String),
    /// The mask settings are invalid.
    #[error(transparent)]
    Mask(#[from] MaskError),
}
