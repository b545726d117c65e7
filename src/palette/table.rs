//! The published palette and its complement mapping.

use super::complement::pair_complements;
use super::PaletteError;
use crate::color::{rgb_to_lab, DistanceMetric, Lab};

/// Largest number of entries an indexed image can address.
pub const MAX_PALETTE_SIZE: usize = 256;

/// One palette color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteEntry {
    /// Position in the palette.
    pub index: u8,
    /// Color as 8-bit sRGB.
    pub rgb: [u8; 3],
    /// Color in L*a*b*.
    pub lab: Lab,
    /// Index of the paired complementary entry.
    pub complement: u8,
}

/// An ordered, immutable set of at most 256 colors.
///
/// Every entry carries the index of its complementary partner. The pairing
/// is symmetric: following it twice always returns to the starting entry.
/// Sessions share a palette through `Arc` once it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Creates a palette and derives its complement pairing.
    pub fn new(colors: &[[u8; 3]]) -> Result<Self, PaletteError> {
        Self::check_len(colors.len())?;
        let labs: Vec<Lab> = colors.iter().map(|&c| rgb_to_lab(c)).collect();
        let complements = pair_complements(colors, &labs);
        Ok(Self::assemble(colors, labs, &complements))
    }

    /// Creates a palette from an externally supplied complement mapping.
    ///
    /// `complements[i]` names the partner of entry `i`; the mapping must be
    /// symmetric and stay within the palette.
    pub fn with_complements(colors: &[[u8; 3]], complements: &[u8]) -> Result<Self, PaletteError> {
        Self::check_len(colors.len())?;
        if complements.len() != colors.len() {
            return Err(PaletteError::AsymmetricComplement {
                index: complements.len().min(colors.len()),
            });
        }
        for (i, &j) in complements.iter().enumerate() {
            let back = complements.get(j as usize).copied();
            if back != Some(i as u8) {
                return Err(PaletteError::AsymmetricComplement { index: i });
            }
        }

        let labs = colors.iter().map(|&c| rgb_to_lab(c)).collect();
        Ok(Self::assemble(colors, labs, complements))
    }

    fn check_len(len: usize) -> Result<(), PaletteError> {
        if len == 0 {
            return Err(PaletteError::EmptySamples);
        }
        if len > MAX_PALETTE_SIZE {
            return Err(PaletteError::InvalidPaletteSize(len));
        }
        Ok(())
    }

    fn assemble(colors: &[[u8; 3]], labs: Vec<Lab>, complements: &[u8]) -> Self {
        let entries = colors
            .iter()
            .zip(labs)
            .zip(complements)
            .enumerate()
            .map(|(i, ((&rgb, lab), &complement))| PaletteEntry {
                index: i as u8,
                rgb,
                lab,
                complement,
            })
            .collect();
        Self { entries }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the palette has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in index order.
    #[inline]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Returns the entry at `index`.
    #[inline]
    pub fn entry(&self, index: u8) -> Option<&PaletteEntry> {
        self.entries.get(index as usize)
    }

    /// Index of the complementary partner of `index`.
    #[inline]
    pub fn complement_of(&self, index: u8) -> Option<u8> {
        self.entry(index).map(|e| e.complement)
    }

    /// The complementary partner entry of `entry`.
    pub fn complement<'a>(&'a self, entry: &PaletteEntry) -> &'a PaletteEntry {
        &self.entries[entry.complement as usize]
    }

    /// Nearest entry to `lab`. Exact ties go to the lowest index.
    pub fn nearest(&self, lab: Lab, metric: DistanceMetric) -> u8 {
        let mut best = 0u8;
        let mut best_dist = f32::INFINITY;
        for entry in &self.entries {
            let d = metric.distance(lab, entry.lab);
            if d < best_dist {
                best_dist = d;
                best = entry.index;
            }
        }
        best
    }

    /// RGB triples in index order.
    pub fn colors(&self) -> Vec<[u8; 3]> {
        self.entries.iter().map(|e| e.rgb).collect()
    }
}
