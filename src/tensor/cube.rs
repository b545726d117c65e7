//! The finished voxel tensor.

use std::sync::Arc;

use super::AssemblyError;
use crate::capture::FRAME_CHANNELS;
use crate::palette::Palette;

/// Largest supported cube side.
pub const MAX_CUBE_SIZE: usize = u16::MAX as usize;

/// A palette-indexed N×N×N tensor.
///
/// `indices` is flattened as `z*N² + y*N + x`; slice `z` comes from the
/// frame captured at temporal position `z`. When present, `raw` holds the
/// source RGBA bytes in the same order.
#[derive(Debug, Clone)]
pub struct CubeTensor {
    /// Side length N.
    pub size: usize,
    /// N³ palette indices, x fastest then y then z.
    pub indices: Vec<u8>,
    /// Palette the indices refer to.
    pub palette: Arc<Palette>,
    /// N³×4 RGBA bytes in the same order, when kept.
    pub raw: Option<Vec<u8>>,
}

impl CubeTensor {
    /// Builds a tensor from parts, checking every length and index.
    pub fn from_parts(
        size: usize,
        indices: Vec<u8>,
        palette: Arc<Palette>,
        raw: Option<Vec<u8>>,
    ) -> Result<Self, AssemblyError> {
        if size == 0 || size > MAX_CUBE_SIZE {
            return Err(AssemblyError::InvalidDimensions(size));
        }
        let voxels = size.pow(3);
        if indices.len() != voxels {
            return Err(AssemblyError::InvalidPlane {
                index: indices.len() / (size * size),
                reason: format!("tensor holds {} indices, expected {voxels}", indices.len()),
            });
        }
        if let Some(pos) = indices.iter().position(|&i| i as usize >= palette.len()) {
            return Err(AssemblyError::InvalidPlane {
                index: pos / (size * size),
                reason: format!("index {} exceeds palette size {}", indices[pos], palette.len()),
            });
        }
        if let Some(raw) = &raw {
            if raw.len() != voxels * FRAME_CHANNELS {
                return Err(AssemblyError::InvalidPlane {
                    index: 0,
                    reason: format!("raw tensor holds {} bytes, expected {}", raw.len(), voxels * FRAME_CHANNELS),
                });
            }
        }

        Ok(Self {
            size,
            indices,
            palette,
            raw,
        })
    }

    /// Returns the number of palette entries.
    #[inline]
    pub fn palette_size(&self) -> usize {
        self.palette.len()
    }

    /// Returns N³.
    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.indices.len()
    }

    /// Palette index at (x, y, z).
    #[inline]
    pub fn index_at(&self, x: usize, y: usize, z: usize) -> u8 {
        self.indices[(z * self.size + y) * self.size + x]
    }

    /// The N² indices of slice `z`.
    pub fn slice(&self, z: usize) -> &[u8] {
        let plane = self.size * self.size;
        &self.indices[z * plane..(z + 1) * plane]
    }

    /// Raw RGBA bytes of slice `z`, if kept.
    pub fn raw_slice(&self, z: usize) -> Option<&[u8]> {
        let plane = self.size * self.size * FRAME_CHANNELS;
        self.raw.as_deref().map(|raw| &raw[z * plane..(z + 1) * plane])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Arc<Palette> {
        Arc::new(Palette::new(&[[0, 0, 0], [255, 255, 255]]).unwrap())
    }

    #[test]
    fn test_layout_is_z_major() {
        let indices: Vec<u8> = (0..8).map(|i| (i == 5) as u8).collect();
        let tensor = CubeTensor::from_parts(2, indices, palette(), None).unwrap();
        // 5 = z1*4 + y0*2 + x1
        assert_eq!(tensor.index_at(1, 0, 1), 1);
        assert_eq!(tensor.slice(1), &[0, 1, 0, 0]);
        assert_eq!(tensor.palette_size(), 2);
    }

    #[test]
    fn test_from_parts_rejects_bad_input() {
        assert!(matches!(
            CubeTensor::from_parts(0, vec![], palette(), None),
            Err(AssemblyError::InvalidDimensions(0))
        ));
        assert!(CubeTensor::from_parts(2, vec![0; 7], palette(), None).is_err());
        assert!(CubeTensor::from_parts(2, vec![2; 8], palette(), None).is_err());
        assert!(CubeTensor::from_parts(2, vec![0; 8], palette(), Some(vec![0; 31])).is_err());
        assert!(CubeTensor::from_parts(2, vec![0; 8], palette(), Some(vec![0; 32])).is_ok());
    }
}
