//! Spatiotemporal blue-noise threshold mask.
//!
//! White noise comes from a keyed BLAKE3 hash of each voxel coordinate, so a
//! seed fully determines the mask. A toroidal separable Gaussian blur of
//! that noise is subtracted to strip low-frequency energy, and the result
//! is rank-normalized so every threshold in [0, 1] is equally likely.
//! Indexing wraps on all three axes; the mask tiles seamlessly.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Context string for deriving the hash key from a seed.
const KEY_CONTEXT: &str = "chroma-cube 2024 blue-noise mask v1";

/// Errors raised while generating or validating a mask.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaskError {
    /// A dimension is zero or the volume is too large.
    #[error("invalid mask dimensions {width}x{height}x{depth}")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Requested temporal period.
        depth: usize,
    },
    /// The value buffer does not match the dimensions.
    #[error("mask holds {actual} values, expected {expected}")]
    LengthMismatch {
        /// width × height × depth.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },
    /// A value is outside [0, 1] or not finite.
    #[error("mask value {value} at {index} is outside [0, 1]")]
    ValueOutOfRange {
        /// Offset of the value.
        index: usize,
        /// The offending value.
        value: f32,
    },
    /// A sigma is negative, not finite, or longer than its axis period.
    #[error("invalid blur sigma {0}")]
    InvalidSigma(f32),
}

/// Mask generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Mask width in pixels.
    pub width: usize,
    /// Mask height in pixels.
    pub height: usize,
    /// Temporal period in frames.
    pub depth: usize,
    /// Gaussian sigma along x and y, in pixels. Zero disables the axis.
    pub sigma_spatial: f32,
    /// Gaussian sigma along t, in frames. Zero disables the axis.
    pub sigma_temporal: f32,
    /// Seed for the keyed white noise.
    pub seed: u64,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            depth: 8,
            sigma_spatial: 1.5,
            sigma_temporal: 1.0,
            seed: 0,
        }
    }
}

impl MaskConfig {
    /// Validates dimensions and blur sigmas.
    pub fn validate(&self) -> Result<(), MaskError> {
        check_dimensions(self.width, self.height, self.depth)?;
        // Sigma is capped at one period of its axis.
        let limits = [
            (self.sigma_spatial, self.width.max(self.height)),
            (self.sigma_temporal, self.depth),
        ];
        for (sigma, period) in limits {
            if !sigma.is_finite() || sigma < 0.0 || sigma > period as f32 {
                return Err(MaskError::InvalidSigma(sigma));
            }
        }
        Ok(())
    }
}

fn check_dimensions(width: usize, height: usize, depth: usize) -> Result<(), MaskError> {
    let total = width.checked_mul(height).and_then(|v| v.checked_mul(depth));
    match total {
        Some(n) if n > 0 && n <= u32::MAX as usize => Ok(()),
        _ => Err(MaskError::InvalidDimensions {
            width,
            height,
            depth,
        }),
    }
}

/// An immutable Sx×Sy×T array of thresholds in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct BlueNoiseMask {
    width: usize,
    height: usize,
    depth: usize,
    /// Values in t-major, then row-major order.
    values: Vec<f32>,
}

impl BlueNoiseMask {
    /// Generates a mask. The same configuration always yields the same mask.
    pub fn generate(config: &MaskConfig) -> Result<Self, MaskError> {
        config.validate()?;
        let (w, h, d) = (config.width, config.height, config.depth);

        let key = blake3::derive_key(KEY_CONTEXT, &config.seed.to_le_bytes());
        let white: Vec<f32> = (0..w * h * d)
            .into_par_iter()
            .map(|i| {
                let (x, y, t) = (i % w, i / w % h, i / (w * h));
                hash_noise(&key, x, y, t)
            })
            .collect();

        let filtered = if config.sigma_spatial == 0.0 && config.sigma_temporal == 0.0 {
            white
        } else {
            let mut low = white.clone();
            blur_axis(&mut low, [w, h, d], 0, config.sigma_spatial);
            blur_axis(&mut low, [w, h, d], 1, config.sigma_spatial);
            blur_axis(&mut low, [w, h, d], 2, config.sigma_temporal);
            white.iter().zip(&low).map(|(v, l)| v - l).collect()
        };

        let values = rank_normalize(&filtered);
        tracing::debug!(
            width = w,
            height = h,
            depth = d,
            sigma_spatial = config.sigma_spatial,
            sigma_temporal = config.sigma_temporal,
            "Generated blue-noise mask"
        );

        Ok(Self {
            width: w,
            height: h,
            depth: d,
            values,
        })
    }

    /// Wraps externally supplied thresholds after validating them.
    pub fn from_values(
        width: usize,
        height: usize,
        depth: usize,
        values: Vec<f32>,
    ) -> Result<Self, MaskError> {
        check_dimensions(width, height, depth)?;
        let expected = width * height * depth;
        if values.len() != expected {
            return Err(MaskError::LengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(MaskError::ValueOutOfRange { index, value });
        }

        Ok(Self {
            width,
            height,
            depth,
            values,
        })
    }

    /// Threshold at (x, y, t), wrapping on every axis.
    #[inline]
    pub fn sample(&self, x: usize, y: usize, t: usize) -> f32 {
        let x = x % self.width;
        let y = y % self.height;
        let t = t % self.depth;
        self.values[(t * self.height + y) * self.width + x]
    }

    /// Returns the width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the temporal period.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the thresholds, x fastest then y then t.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Uniform value in [0, 1) from a keyed hash of the coordinate.
fn hash_noise(key: &[u8; 32], x: usize, y: usize, t: usize) -> f32 {
    let mut input = [0u8; 12];
    input[0..4].copy_from_slice(&(x as u32).to_le_bytes());
    input[4..8].copy_from_slice(&(y as u32).to_le_bytes());
    input[8..12].copy_from_slice(&(t as u32).to_le_bytes());

    let hash = blake3::keyed_hash(key, &input);
    let bytes = hash.as_bytes();
    let v = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) >> 8;
    v as f32 / (1u32 << 24) as f32
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as i32;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Toroidal 1-D Gaussian blur along `axis` (0 = x, 1 = y, 2 = t).
fn blur_axis(data: &mut [f32], dims: [usize; 3], axis: usize, sigma: f32) {
    if sigma == 0.0 || dims[axis] == 1 {
        return;
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let len = dims[axis] as isize;
    let stride = match axis {
        0 => 1,
        1 => dims[0],
        _ => dims[0] * dims[1],
    };

    let src = data.to_vec();
    data.par_iter_mut().enumerate().for_each(|(i, out)| {
        let pos = ((i / stride) % dims[axis]) as isize;
        let base = i - pos as usize * stride;
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let p = (pos + k as isize - radius).rem_euclid(len) as usize;
                weight * src[base + p * stride]
            })
            .sum();
    });
}

/// Replaces each value by its rank, scaled to [0, 1]. Ties break by position.
fn rank_normalize(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    if n == 1 {
        return vec![0.5];
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let scale = (n - 1) as f32;
    let mut out = vec![0.0; n];
    for (rank, idx) in order.into_iter().enumerate() {
        out[idx] = rank as f32 / scale;
    }
    out
}
