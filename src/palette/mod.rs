//! Perceptual palette construction with complementary-color pairing.
//!
//! A palette is built once per session from sampled frame colors and then
//! shared read-only by every dithering worker.

mod builder;
mod complement;
mod table;

pub use builder::{build, BuildReport, PaletteBuilder, PaletteConfig};
pub use complement::{ideal_complement, COMPLEMENT_HUE_SHIFT};
pub use table::{Palette, PaletteEntry, MAX_PALETTE_SIZE};

use thiserror::Error;

/// Errors raised while building or validating a palette.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaletteError {
    /// The palette would hold fewer than 2 or more than 256 entries.
    #[error("invalid palette size {0} (must be 2-256)")]
    InvalidPaletteSize(usize),
    /// No sample colors were given.
    #[error("no sample colors")]
    EmptySamples,
    /// The complement mapping is not a symmetric involution.
    #[error("complement mapping is not symmetric at entry {index}")]
    AsymmetricComplement {
        /// Entry whose complement does not map back.
        index: usize,
    },
    /// The builder settings are invalid.
    #[error("invalid palette configuration: {0}")]
    InvalidConfig(String),
}
