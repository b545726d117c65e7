//! Chroma Cube Library
//!
//! Turns a sequence of N captured square frames into an N×N×N cube of
//! palette indices and serializes it as an animated GIF whose frames are
//! the cube's z-slices.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → codec (spool) → palette → dither → tensor → animation
//!                  ↑                     ↑
//!                  └──── pipeline (session, cancellation) ────┘
//! ```
//!
//! # Design Principles
//!
//! - **Perceptual color**: palette building and dithering work in CIE L\*a\*b\*
//! - **Complementary pairs**: every palette entry has a complement, and the
//!   dither may substitute it where the mask allows
//! - **Spatiotemporal blue noise**: one 3D mask drives thresholds across both
//!   pixels and frames
//! - **Immutable shared state**: palette and mask are built once per run and
//!   shared through `Arc`
//!
//! # Example
//!
//! ```no_run
//! use chroma_cube::{
//!     capture::{FileConfig, MockCamera},
//!     pipeline::CubeSession,
//! };
//!
//! let mut config = FileConfig::default();
//! config.cube.size = 32;
//!
//! let mut session = CubeSession::new(config).unwrap();
//! let mut camera = MockCamera::new();
//! let output = session.run(&mut camera).unwrap();
//!
//! std::fs::write("cube.gif", &output.gif).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

/// Animated GIF output of the cube.
pub mod animation;
/// Frames, capture sources and configuration.
pub mod capture;
/// Lossless raster codec and frame spool.
pub mod codec;
/// Color spaces and color differences.
pub mod color;
/// Blue-noise mask and ditherer.
pub mod dither;
/// Palette construction with complementary pairs.
pub mod palette;
/// Session orchestration and cancellation.
pub mod pipeline;
/// Cube tensor and its assembler.
pub mod tensor;

// Re-export commonly used types at crate root
pub use animation::{AnimatedImageEncoder, AnimationConfig, EncodingError};
pub use capture::{Camera, CaptureConfig, FileConfig, Frame, MockCamera};
pub use codec::FormatError;
pub use color::{DistanceMetric, Lab};
pub use dither::{BlueNoiseMask, Ditherer};
pub use palette::{Palette, PaletteBuilder, PaletteError};
pub use pipeline::{CancelToken, CubeSession, PipelineError, SessionOutput};
pub use tensor::{AssemblyError, CubeTensor, TensorAssembler};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
