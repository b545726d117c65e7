//! Perceptual palette construction.
//!
//! Sample colors are deduplicated into a weighted histogram and clustered
//! with a median cut in Lab space. Boxes whose colors already sit within the
//! merge threshold are never split, so near-identical shades collapse into
//! one entry and leave room for complements.

use serde::{Deserialize, Serialize};

use super::complement::COMPLEMENT_HUE_SHIFT;
use super::{Palette, PaletteError, MAX_PALETTE_SIZE};
use crate::capture::FRAME_CHANNELS;
use crate::color::{delta_e_76, lab_to_rgb, rgb_to_lab, rotate_hue, Lab};

/// Palette construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Maximum number of entries (2-256).
    pub max_size: usize,
    /// ΔE below which colors are considered the same.
    pub merge_threshold: f32,
    /// Take every n-th pixel of a frame as a sample.
    pub sample_stride: usize,
    /// Fill unused slots with complements of existing entries.
    pub complement_fill: bool,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_PALETTE_SIZE,
            merge_threshold: 2.3,
            sample_stride: 1,
            complement_fill: true,
        }
    }
}

impl PaletteConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), PaletteError> {
        if !(2..=MAX_PALETTE_SIZE).contains(&self.max_size) {
            return Err(PaletteError::InvalidPaletteSize(self.max_size));
        }
        if !self.merge_threshold.is_finite() || self.merge_threshold < 0.0 {
            return Err(PaletteError::InvalidConfig(format!(
                "merge_threshold must be a non-negative number, got {}",
                self.merge_threshold
            )));
        }
        if self.sample_stride == 0 {
            return Err(PaletteError::InvalidConfig(
                "sample_stride must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// What happened while building a palette.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Samples considered.
    pub samples: usize,
    /// Distinct colors among the samples.
    pub distinct_colors: usize,
    /// Entries produced by clustering.
    pub clusters: usize,
    /// Complement entries added to fill the palette.
    pub complements_added: usize,
    /// Whether black or white had to be added to reach two entries.
    pub padded: bool,
    /// Largest ΔE between a sample color and the entry it was merged into.
    pub max_merge_error: f32,
    /// Clusters whose radius exceeds the merge threshold.
    pub lossy_merges: usize,
}

/// Builds palettes from sampled colors.
#[derive(Debug, Clone)]
pub struct PaletteBuilder {
    config: PaletteConfig,
}

#[derive(Debug, Clone, Copy)]
struct ColorCount {
    rgb: [u8; 3],
    lab: Lab,
    count: u64,
}

impl ColorCount {
    #[inline]
    fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.lab.l,
            1 => self.lab.a,
            _ => self.lab.b,
        }
    }
}

struct ColorBox {
    colors: Vec<ColorCount>,
}

impl ColorBox {
    /// Widest Lab axis and its extent.
    fn widest_axis(&self) -> (usize, f32) {
        let mut best = (0, 0.0f32);
        for axis in 0..3 {
            let (lo, hi) = self.colors.iter().fold((f32::MAX, f32::MIN), |(lo, hi), c| {
                let v = c.axis(axis);
                (lo.min(v), hi.max(v))
            });
            if hi - lo > best.1 {
                best = (axis, hi - lo);
            }
        }
        best
    }

    fn can_split(&self, threshold: f32) -> bool {
        self.colors.len() >= 2 && self.widest_axis().1 > threshold
    }

    /// Splits at the weighted median of the widest axis.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (axis, _) = self.widest_axis();
        self.colors.sort_by(|x, y| {
            x.axis(axis)
                .total_cmp(&y.axis(axis))
                .then(x.rgb.cmp(&y.rgb))
        });

        let total: u64 = self.colors.iter().map(|c| c.count).sum();
        let mut acc = 0u64;
        let mut cut = 1;
        for (i, c) in self.colors.iter().enumerate() {
            acc += c.count;
            if acc * 2 >= total {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(cut);
        (self, ColorBox { colors: right })
    }

    /// Weighted mean color and the largest member distance to it.
    fn representative(&self) -> ([u8; 3], f32) {
        let total: f64 = self.colors.iter().map(|c| c.count as f64).sum();
        let mut mean = [0f64; 3];
        for c in &self.colors {
            let w = c.count as f64 / total;
            mean[0] += c.lab.l as f64 * w;
            mean[1] += c.lab.a as f64 * w;
            mean[2] += c.lab.b as f64 * w;
        }

        let rgb = if self.colors.len() == 1 {
            self.colors[0].rgb
        } else {
            lab_to_rgb(Lab::new(mean[0] as f32, mean[1] as f32, mean[2] as f32))
        };
        let lab = rgb_to_lab(rgb);
        let radius = self
            .colors
            .iter()
            .map(|c| delta_e_76(c.lab, lab))
            .fold(0.0f32, f32::max);
        (rgb, radius)
    }
}

impl PaletteBuilder {
    /// Creates a builder after validating its settings.
    pub fn new(config: PaletteConfig) -> Result<Self, PaletteError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the builder settings.
    pub fn config(&self) -> &PaletteConfig {
        &self.config
    }

    /// Appends strided RGB samples of an RGBA frame buffer to `out`.
    pub fn sample_frame(&self, pixels: &[u8], out: &mut Vec<[u8; 3]>) {
        out.extend(
            pixels
                .chunks_exact(FRAME_CHANNELS)
                .step_by(self.config.sample_stride)
                .map(|px| [px[0], px[1], px[2]]),
        );
    }

    /// Builds a palette of at most `max_size` entries from sample colors.
    pub fn build(&self, samples: &[[u8; 3]]) -> Result<(Palette, BuildReport), PaletteError> {
        if samples.is_empty() {
            return Err(PaletteError::EmptySamples);
        }

        let max_size = self.config.max_size;
        let threshold = self.config.merge_threshold;
        let histogram = histogram(samples);

        let mut report = BuildReport {
            samples: samples.len(),
            distinct_colors: histogram.len(),
            ..Default::default()
        };

        let mut colors: Vec<[u8; 3]> = if histogram.len() <= max_size {
            histogram.iter().map(|c| c.rgb).collect()
        } else {
            let clustered = median_cut(histogram, max_size, threshold);
            let mut colors = Vec::with_capacity(clustered.len());
            for (rgb, radius) in clustered {
                report.max_merge_error = report.max_merge_error.max(radius);
                if radius > threshold {
                    report.lossy_merges += 1;
                }
                if !colors.contains(&rgb) {
                    colors.push(rgb);
                }
            }
            colors
        };

        let mut keyed: Vec<(f32, [u8; 3])> = colors.iter().map(|&c| (rgb_to_lab(c).l, c)).collect();
        keyed.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
        colors = keyed.into_iter().map(|(_, c)| c).collect();
        report.clusters = colors.len();

        if report.lossy_merges > 0 {
            tracing::warn!(
                lossy_merges = report.lossy_merges,
                max_merge_error = report.max_merge_error,
                threshold,
                "Palette merged colors beyond threshold"
            );
        }

        if self.config.complement_fill {
            report.complements_added = fill_complements(&mut colors, max_size, threshold);
        }

        if colors.len() < 2 {
            let only = rgb_to_lab(colors[0]);
            let black = [0, 0, 0];
            let white = [255, 255, 255];
            let pad = if delta_e_76(only, rgb_to_lab(black)) >= delta_e_76(only, rgb_to_lab(white)) {
                black
            } else {
                white
            };
            colors.push(pad);
            report.padded = true;
        }

        let palette = Palette::new(&colors)?;

        tracing::debug!(
            samples = report.samples,
            distinct = report.distinct_colors,
            clusters = report.clusters,
            complements = report.complements_added,
            entries = palette.len(),
            "Built palette"
        );

        Ok((palette, report))
    }
}

/// Builds a palette with default settings and the given size limit.
pub fn build(samples: &[[u8; 3]], max_size: usize) -> Result<Palette, PaletteError> {
    let builder = PaletteBuilder::new(PaletteConfig {
        max_size,
        ..Default::default()
    })?;
    builder.build(samples).map(|(palette, _)| palette)
}

/// Sorted, deduplicated color counts.
fn histogram(samples: &[[u8; 3]]) -> Vec<ColorCount> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    let mut out: Vec<ColorCount> = Vec::new();
    for rgb in sorted {
        match out.last_mut() {
            Some(last) if last.rgb == rgb => last.count += 1,
            _ => out.push(ColorCount {
                rgb,
                lab: rgb_to_lab(rgb),
                count: 1,
            }),
        }
    }
    out
}

fn median_cut(colors: Vec<ColorCount>, max_size: usize, threshold: f32) -> Vec<([u8; 3], f32)> {
    let mut boxes = vec![ColorBox { colors }];

    while boxes.len() < max_size {
        let pick = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.can_split(threshold))
            .map(|(i, b)| (i, b.widest_axis().1))
            .fold(None, |best: Option<(usize, f32)>, (i, extent)| match best {
                Some((_, e)) if e >= extent => best,
                _ => Some((i, extent)),
            });

        let Some((idx, _)) = pick else {
            break;
        };
        let (left, right) = boxes.remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }

    boxes.iter().map(ColorBox::representative).collect()
}

/// Adds hue-rotated complements while slots remain. Returns how many.
fn fill_complements(colors: &mut Vec<[u8; 3]>, max_size: usize, threshold: f32) -> usize {
    let originals = colors.len();
    let mut added = 0;

    for i in 0..originals {
        if colors.len() >= max_size {
            break;
        }
        let rgb = rotate_hue(colors[i], COMPLEMENT_HUE_SHIFT);
        let target = rgb_to_lab(rgb);
        let covered = colors
            .iter()
            .any(|&c| delta_e_76(rgb_to_lab(c), target) <= threshold);
        if !covered {
            colors.push(rgb);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(max_size: usize) -> PaletteBuilder {
        PaletteBuilder::new(PaletteConfig {
            max_size,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_empty_samples() {
        assert!(matches!(
            builder(16).build(&[]),
            Err(PaletteError::EmptySamples)
        ));
    }

    #[test]
    fn test_invalid_sizes() {
        for size in [0, 1, 257] {
            assert!(matches!(
                build(&[[1, 2, 3]], size),
                Err(PaletteError::InvalidPaletteSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn test_uniform_red_gets_complement() {
        let samples = vec![[255, 0, 0]; 64];
        let (palette, report) = builder(16).build(&samples).unwrap();

        assert_eq!(palette.colors(), vec![[255, 0, 0], [0, 255, 255]]);
        assert_eq!(report.distinct_colors, 1);
        assert_eq!(report.complements_added, 1);
        assert_eq!(palette.complement_of(0), Some(1));
        assert!(!report.padded);
    }

    #[test]
    fn test_uniform_gray_is_padded() {
        let (palette, report) = builder(8).build(&[[40, 40, 40]; 10]).unwrap();
        assert_eq!(palette.colors(), vec![[40, 40, 40], [255, 255, 255]]);
        assert!(report.padded);
    }

    #[test]
    fn test_few_colors_kept_exactly() {
        let samples = [[10, 20, 30], [200, 100, 0], [10, 20, 30], [0, 0, 255]];
        let config = PaletteConfig {
            max_size: 8,
            complement_fill: false,
            ..Default::default()
        };
        let (palette, report) = PaletteBuilder::new(config).unwrap().build(&samples).unwrap();

        assert_eq!(palette.len(), 3);
        for c in [[10, 20, 30], [200, 100, 0], [0, 0, 255]] {
            assert!(palette.colors().contains(&c));
        }
        assert_eq!(report.max_merge_error, 0.0);
    }

    #[test]
    fn test_many_colors_are_clustered() {
        let samples: Vec<[u8; 3]> = (0..4096u32)
            .map(|i| [(i % 16 * 16) as u8, (i / 16 % 16 * 16) as u8, (i / 256 * 16) as u8])
            .collect();
        let (palette, report) = builder(32).build(&samples).unwrap();

        assert!(palette.len() <= 32);
        assert!(palette.len() >= 16);
        assert_eq!(report.distinct_colors, 4096);
        assert!(report.max_merge_error > 0.0);
    }

    #[test]
    fn test_near_duplicates_merge() {
        // 300 shades within a couple of ΔE of each other.
        let samples: Vec<[u8; 3]> = (0..300u32)
            .map(|i| [100 + (i % 3) as u8, 100 + (i / 3 % 10) as u8 / 5, 100])
            .collect();
        let config = PaletteConfig {
            max_size: 4,
            merge_threshold: 10.0,
            complement_fill: false,
            ..Default::default()
        };
        let (palette, report) = PaletteBuilder::new(config).unwrap().build(&samples).unwrap();
        assert_eq!(report.clusters, 1);
        assert_eq!(report.lossy_merges, 0);
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let samples: Vec<[u8; 3]> = (0..2000u32)
            .map(|i| [(i * 37 % 256) as u8, (i * 91 % 256) as u8, (i * 13 % 256) as u8])
            .collect();
        let a = builder(64).build(&samples).unwrap();
        let b = builder(64).build(&samples).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn test_complements_are_involutive() {
        let samples: Vec<[u8; 3]> = (0..500u32)
            .map(|i| [(i * 7 % 256) as u8, (i * 3 % 256) as u8, (255 - i % 256) as u8])
            .collect();
        let (palette, _) = builder(48).build(&samples).unwrap();
        for entry in palette.entries() {
            assert_eq!(palette.complement(palette.complement(entry)).index, entry.index);
        }
    }

    #[test]
    fn test_sample_frame_stride() {
        let b = PaletteBuilder::new(PaletteConfig {
            sample_stride: 2,
            ..Default::default()
        })
        .unwrap();
        let pixels = [1, 1, 1, 255, 2, 2, 2, 255, 3, 3, 3, 255];
        let mut out = Vec::new();
        b.sample_frame(&pixels, &mut out);
        assert_eq!(out, vec![[1, 1, 1], [3, 3, 3]]);
    }
}
