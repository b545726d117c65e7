//! Frame sources and session configuration.
//!
//! The camera is an external collaborator: anything that can deliver square
//! RGBA rasters implements [`Camera`]. Frames are fitted to the cube side
//! before they enter the rest of the pipeline.

mod camera;
mod config;
mod fit;
mod frame;

pub use camera::{Camera, CameraError, MockCamera};
pub use config::{CaptureConfig, ConfigError, CubeConfig, FileConfig};
pub use fit::fit_to_cube;
pub use frame::{Frame, FRAME_CHANNELS};
