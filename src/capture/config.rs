//! Capture and session configuration.
//!
//! The configuration is owned by an external layer; this crate only reads
//! it. Every section has sensible defaults so a TOML file only needs the
//! values it wants to override.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::animation::{delay_from_fps, AnimationConfig};
use crate::dither::DitherConfig;
use crate::palette::PaletteConfig;

/// Configuration for the capture source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Side length of the square frames the source delivers.
    pub resolution: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Amplitude of simulated sensor noise (mock source only).
    pub sensor_noise: u8,
    /// Seed for the simulated sensor noise (mock source only).
    pub seed: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            fps: 25,
            sensor_noise: 6,
            seed: 0x5EED,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified resolution.
    pub fn with_resolution(resolution: u32) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Shape of the voxel cube and how frames travel to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    /// Cube side N: frames are fitted to N×N and N frames are captured.
    pub size: u32,
    /// Keep the raw RGBA tensor alongside the indices.
    pub keep_raw_tensor: bool,
    /// Spool frames through the lossless codec instead of holding them raw.
    pub spool_frames: bool,
    /// Dithering worker threads (0 = available parallelism).
    pub workers: usize,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            size: 128,
            keep_raw_tensor: false,
            spool_frames: true,
            workers: 0,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Frame resolution is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate is outside 1-120.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// Cube side is outside 1-65535.
    #[error("invalid cube size {0} (must be 1-65535)")]
    InvalidCubeSize(u32),
    /// The `[palette]` section is invalid.
    #[error("invalid palette settings: {0}")]
    InvalidPalette(String),
    /// The `[dither]` section is invalid.
    #[error("invalid dither settings: {0}")]
    InvalidDither(String),
    /// The `[output]` section is invalid.
    #[error("invalid output settings: {0}")]
    InvalidOutput(String),
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Capture source settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Cube shape and frame handling.
    #[serde(default)]
    pub cube: CubeConfig,
    /// Palette builder settings.
    #[serde(default)]
    pub palette: PaletteConfig,
    /// Dither and mask settings.
    #[serde(default)]
    pub dither: DitherConfig,
    /// Animated image settings.
    #[serde(default)]
    pub output: AnimationConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// Without an explicit `[output] frame_delay_cs` the slice delay follows
    /// `[capture] fps`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let delay_set = table
            .get("output")
            .and_then(|output| output.get("frame_delay_cs"))
            .is_some();
        if !delay_set {
            config.output.frame_delay_cs = delay_from_fps(config.capture.fps);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the capture rate and the matching slice delay.
    pub fn set_fps(&mut self, fps: u32) {
        self.capture.fps = fps;
        self.output.frame_delay_cs = delay_from_fps(fps);
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        if self.cube.size == 0 || self.cube.size > u16::MAX as u32 {
            return Err(ConfigError::InvalidCubeSize(self.cube.size));
        }
        self.palette
            .validate()
            .map_err(|e| ConfigError::InvalidPalette(e.to_string()))?;
        self.dither
            .validate()
            .map_err(|e| ConfigError::InvalidDither(e.to_string()))?;
        self.output
            .validate()
            .map_err(|e| ConfigError::InvalidOutput(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.resolution = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [cube]
            size = 32

            [palette]
            max_size = 64

            [dither]
            amplitude = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.cube.size, 32);
        assert_eq!(config.palette.max_size, 64);
        assert_eq!(config.dither.amplitude, 0.0);
        assert_eq!(config.capture.fps, 25);
        assert!(config.cube.spool_frames);
    }

    #[test]
    fn test_invalid_cube_size_rejected() {
        let result = FileConfig::from_toml("[cube]\nsize = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidCubeSize(0))));
    }

    #[test]
    fn test_invalid_palette_size_rejected() {
        let result = FileConfig::from_toml("[palette]\nmax_size = 1\n");
        assert!(matches!(result, Err(ConfigError::InvalidPalette(_))));
    }

    #[test]
    fn test_zero_loop_count_rejected() {
        let result = FileConfig::from_toml("[output]\nloop_count = { finite = 0 }\n");
        assert!(matches!(result, Err(ConfigError::InvalidOutput(_))));

        let config = FileConfig::from_toml("[output]\nloop_count = { finite = 3 }\n").unwrap();
        assert_eq!(config.output.loop_count, crate::animation::LoopCount::Finite(3));
    }

    #[test]
    fn test_frame_delay_follows_fps() {
        let config = FileConfig::from_toml("[capture]\nfps = 50\n").unwrap();
        assert_eq!(config.output.frame_delay_cs, 2);

        let config =
            FileConfig::from_toml("[capture]\nfps = 50\n\n[output]\nframe_delay_cs = 7\n").unwrap();
        assert_eq!(config.output.frame_delay_cs, 7);

        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.output.frame_delay_cs, 4);

        let mut config = FileConfig::default();
        config.set_fps(10);
        assert_eq!(config.capture.fps, 10);
        assert_eq!(config.output.frame_delay_cs, 10);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nframe_delay_cs = 7").unwrap();

        let config = FileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output.frame_delay_cs, 7);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            FileConfig::from_file("/nonexistent/chroma-cube.toml"),
            Err(ConfigError::FileReadError(_))
        ));
    }
}
