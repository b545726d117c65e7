//! Camera abstraction for frame capture.
//!
//! Real camera sessions live outside this crate; anything that can hand
//! over square RGBA rasters implements [`Camera`]. The [`MockCamera`]
//! renders a deterministic moving scene for demos and tests.

use super::{CaptureConfig, Frame};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The source rejected the configuration.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// Capture was requested before `open`.
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for frame sources.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures the next frame. Indices count up from 0 after `open`.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Mock camera rendering a drifting color gradient with sensor noise.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    rng: Option<ChaCha8Rng>,
    sequence: usize,
}

impl MockCamera {
    /// Creates a closed mock camera.
    pub fn new() -> Self {
        Self::default()
    }

    fn render(config: &CaptureConfig, rng: &mut ChaCha8Rng, t: usize) -> Vec<u8> {
        let side = config.resolution as usize;
        let mut pixels = Vec::with_capacity(side * side * 4);
        let noise = config.sensor_noise as i32;
        let drift = (t * 4) as i32;

        for y in 0..side {
            for x in 0..side {
                let u = (x * 255 / side.max(1)) as i32;
                let v = (y * 255 / side.max(1)) as i32;
                let base = [
                    (u + drift) % 256,
                    (v + drift / 2) % 256,
                    (255 - u / 2 - v / 2 + drift) % 256,
                ];

                for channel in base {
                    let jitter = if noise > 0 {
                        (rng.next_u32() % (2 * noise as u32 + 1)) as i32 - noise
                    } else {
                        0
                    };
                    pixels.push((channel + jitter).clamp(0, 255) as u8);
                }
                pixels.push(255);
            }
        }

        pixels
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.rng = Some(ChaCha8Rng::seed_from_u64(config.seed));
        self.sequence = 0;
        tracing::info!(
            resolution = config.resolution,
            fps = config.fps,
            "MockCamera opened"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        let rng = self.rng.as_mut().ok_or(CameraError::NotInitialized)?;

        let pixels = Self::render(config, rng, self.sequence);
        let frame = Frame::new(pixels, config.resolution, self.sequence);
        self.sequence += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        self.rng = None;
        tracing::info!("MockCamera closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> CaptureConfig {
        CaptureConfig {
            resolution: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();

        assert!(!camera.is_open());

        camera.open(&small_config()).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.index(), 0);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.index(), 1);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_same_seed_same_frames() {
        let mut a = MockCamera::new();
        let mut b = MockCamera::new();
        a.open(&small_config()).unwrap();
        b.open(&small_config()).unwrap();

        for _ in 0..3 {
            assert_eq!(a.capture().unwrap().pixels(), b.capture().unwrap().pixels());
        }
    }

    #[test]
    fn test_scene_moves_between_frames() {
        let mut camera = MockCamera::new();
        camera.open(&small_config()).unwrap();
        let first = camera.capture().unwrap();
        let second = camera.capture().unwrap();
        assert_ne!(first.pixels(), second.pixels());
    }
}
