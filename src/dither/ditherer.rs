//! Per-pixel palette assignment guided by the blue-noise mask.

use std::f32::consts::TAU;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{BlueNoiseMask, DitherError, MaskConfig};
use crate::capture::{Frame, FRAME_CHANNELS};
use crate::color::{rgb_to_lab, DistanceMetric, Lab};
use crate::palette::Palette;

/// Dithering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DitherConfig {
    /// Peak-to-peak L* perturbation applied by the mask.
    pub amplitude: f32,
    /// Weight γ of the complementary-color substitution.
    pub style_weight: f32,
    /// Color difference used for lookup and scoring.
    pub metric: DistanceMetric,
    /// Settings for generating the session mask.
    pub mask: MaskConfig,
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self {
            amplitude: 2.0,
            style_weight: 0.2,
            metric: DistanceMetric::Cie76,
            mask: MaskConfig::default(),
        }
    }
}

impl DitherConfig {
    /// Validates the weights and the mask generation settings.
    pub fn validate(&self) -> Result<(), DitherError> {
        self.validate_weights()?;
        self.mask.validate()?;
        Ok(())
    }

    /// Validates amplitude and style weight only.
    fn validate_weights(&self) -> Result<(), DitherError> {
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(DitherError::InvalidConfig(format!(
                "amplitude must be a non-negative number, got {}",
                self.amplitude
            )));
        }
        if !self.style_weight.is_finite() || self.style_weight < 0.0 {
            return Err(DitherError::InvalidConfig(format!(
                "style_weight must be a non-negative number, got {}",
                self.style_weight
            )));
        }
        Ok(())
    }
}

/// Maps frames to palette index planes.
///
/// Holds only shared immutable state, so one instance can serve any number
/// of threads and always produces the same plane for the same input.
#[derive(Debug, Clone)]
pub struct Ditherer {
    mask: Arc<BlueNoiseMask>,
    palette: Arc<Palette>,
    amplitude: f32,
    style_weight: f32,
    metric: DistanceMetric,
}

impl Ditherer {
    /// Creates a ditherer over a shared mask and palette.
    pub fn new(
        mask: Arc<BlueNoiseMask>,
        palette: Arc<Palette>,
        config: &DitherConfig,
    ) -> Result<Self, DitherError> {
        config.validate_weights()?;
        Ok(Self {
            mask,
            palette,
            amplitude: config.amplitude,
            style_weight: config.style_weight,
            metric: config.metric,
        })
    }

    /// Returns the shared palette.
    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    /// Returns the shared mask.
    pub fn mask(&self) -> &Arc<BlueNoiseMask> {
        &self.mask
    }

    /// Picks the palette index for one color given its mask threshold `m`.
    ///
    /// The lightness is nudged by the mask before the nearest lookup. The
    /// complement of that entry replaces it only when its score is strictly
    /// higher, where the complement gets a bonus of `γ·sin(2πm)`.
    pub fn choose(&self, original: Lab, m: f32) -> u8 {
        let perturbed = Lab {
            l: original.l + (m - 0.5) * self.amplitude,
            ..original
        };
        let nearest = self.palette.nearest(perturbed, self.metric);

        let Some(near) = self.palette.entry(nearest) else {
            return nearest;
        };
        if near.complement == near.index {
            return nearest;
        }
        let comp = self.palette.complement(near);

        let score_nearest = -self.metric.distance(original, near.lab);
        let score_complement =
            -self.metric.distance(original, comp.lab) + self.style_weight * (TAU * m).sin();

        if score_complement > score_nearest {
            comp.index
        } else {
            nearest
        }
    }

    /// Dithers a frame into an index plane of `size²` entries.
    ///
    /// The frame's temporal index selects the mask layer.
    pub fn dither_frame(&self, frame: &Frame) -> Result<Vec<u8>, DitherError> {
        self.dither_pixels(frame.pixels(), frame.size(), frame.index())
    }

    /// Dithers a square RGBA buffer observed at temporal position `t`.
    pub fn dither_pixels(&self, pixels: &[u8], size: u32, t: usize) -> Result<Vec<u8>, DitherError> {
        let side = size as usize;
        let expected = side * side * FRAME_CHANNELS;
        if side == 0 || pixels.len() != expected {
            return Err(DitherError::InvalidFrame {
                expected,
                actual: pixels.len(),
            });
        }

        let mut plane = vec![0u8; side * side];
        plane
            .par_chunks_mut(side)
            .zip(pixels.par_chunks(side * FRAME_CHANNELS))
            .enumerate()
            .for_each(|(y, (row, src))| {
                for (x, (out, px)) in row.iter_mut().zip(src.chunks_exact(FRAME_CHANNELS)).enumerate() {
                    let lab = rgb_to_lab([px[0], px[1], px[2]]);
                    *out = self.choose(lab, self.mask.sample(x, y, t));
                }
            });

        tracing::trace!(t, size, "Dithered frame");
        Ok(plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mask() -> Arc<BlueNoiseMask> {
        Arc::new(
            BlueNoiseMask::generate(&MaskConfig {
                width: 16,
                height: 16,
                depth: 4,
                seed: 9,
                ..Default::default()
            })
            .unwrap(),
        )
    }

    fn ramp_palette() -> Arc<Palette> {
        let colors: Vec<[u8; 3]> = (0..8u8).map(|i| [i * 36, 255 - i * 30, i * 20]).collect();
        Arc::new(Palette::new(&colors).unwrap())
    }

    fn gradient(size: u32, index: usize) -> Frame {
        let side = size as usize;
        let pixels = (0..side * side)
            .flat_map(|i| {
                let (x, y) = (i % side, i / side);
                [(x * 255 / side) as u8, (y * 255 / side) as u8, 128, 255]
            })
            .collect();
        Frame::new(pixels, size, index)
    }

    fn ditherer(amplitude: f32, style_weight: f32) -> Ditherer {
        let config = DitherConfig {
            amplitude,
            style_weight,
            ..Default::default()
        };
        Ditherer::new(mask(), ramp_palette(), &config).unwrap()
    }

    #[test]
    fn test_degenerate_is_nearest_lookup() {
        let d = ditherer(0.0, 0.0);
        let frame = gradient(24, 5);
        let plane = d.dither_frame(&frame).unwrap();

        for (i, px) in frame.pixels().chunks_exact(4).enumerate() {
            let expected = d
                .palette()
                .nearest(rgb_to_lab([px[0], px[1], px[2]]), DistanceMetric::Cie76);
            assert_eq!(plane[i], expected);
        }
    }

    #[test]
    fn test_complement_needs_strictly_higher_score() {
        let palette = Arc::new(Palette::new(&[[255, 0, 0], [0, 255, 255]]).unwrap());
        let config = DitherConfig {
            amplitude: 0.0,
            style_weight: 1000.0,
            ..Default::default()
        };
        let d = Ditherer::new(mask(), palette, &config).unwrap();
        let red = rgb_to_lab([255, 0, 0]);

        // sin(2π·0.25) = 1 pushes towards the complement.
        assert_eq!(d.choose(red, 0.25), 1);
        // sin(2π·0.75) = -1 keeps the nearest entry.
        assert_eq!(d.choose(red, 0.75), 0);
    }

    #[test]
    fn test_small_style_weight_keeps_nearest() {
        let palette = Arc::new(Palette::new(&[[255, 0, 0], [0, 255, 255]]).unwrap());
        let d = Ditherer::new(mask(), palette, &DitherConfig::default()).unwrap();
        for m in [0.0, 0.1, 0.25, 0.5, 0.9] {
            assert_eq!(d.choose(rgb_to_lab([250, 10, 10]), m), 0);
        }
    }

    #[test]
    fn test_supplied_mask_ignores_generation_settings() {
        let mut config = DitherConfig::default();
        config.mask.width = 0;
        assert!(config.validate().is_err());

        let d = Ditherer::new(mask(), ramp_palette(), &config).unwrap();
        assert_eq!(d.mask().width(), 16);

        config.amplitude = -1.0;
        assert!(matches!(
            Ditherer::new(mask(), ramp_palette(), &config),
            Err(DitherError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_temporal_index_changes_mask_layer() {
        let d = ditherer(40.0, 0.0);
        let a = d.dither_pixels(gradient(16, 0).pixels(), 16, 0).unwrap();
        let b = d.dither_pixels(gradient(16, 0).pixels(), 16, 4).unwrap();
        let c = d.dither_pixels(gradient(16, 0).pixels(), 16, 1).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_concurrent_calls_agree() {
        let d = ditherer(6.0, 0.5);
        let frame = gradient(32, 2);
        let reference = d.dither_frame(&frame).unwrap();

        let results: Vec<Vec<u8>> = (0..8)
            .into_par_iter()
            .map(|_| d.dither_frame(&frame).unwrap())
            .collect();
        assert!(results.iter().all(|r| *r == reference));

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| d.dither_frame(&frame).unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), reference);
            }
        });
    }

    #[test]
    fn test_wrong_buffer_rejected() {
        let d = ditherer(2.0, 0.2);
        assert!(matches!(
            d.dither_pixels(&[0u8; 10], 2, 0),
            Err(DitherError::InvalidFrame { expected: 16, actual: 10 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DitherConfig {
            amplitude: f32::NAN,
            ..Default::default()
        };
        assert!(Ditherer::new(mask(), ramp_palette(), &config).is_err());
    }

    proptest! {
        #[test]
        fn prop_repeated_dithering_is_identical(
            pixels in proptest::collection::vec(any::<u8>(), 8 * 8 * 4),
            t in 0usize..16,
        ) {
            let d = ditherer(4.0, 0.3);
            let first = d.dither_pixels(&pixels, 8, t).unwrap();
            let second = d.dither_pixels(&pixels, 8, t).unwrap();
            prop_assert!(first.iter().all(|&i| (i as usize) < d.palette().len()));
            prop_assert_eq!(first, second);
        }
    }
}
