//! Frame type representing a captured square RGBA raster.

use std::time::Instant;

/// Bytes per pixel of every frame.
pub const FRAME_CHANNELS: usize = 4;

/// A single captured frame.
///
/// Frames are square RGBA8 rasters tagged with their temporal position in
/// the capture. The temporal index decides which z-slice of the cube the
/// frame becomes; arrival order carries no meaning.
#[derive(Clone)]
pub struct Frame {
    /// Raw RGBA pixel data, row-major.
    pixels: Vec<u8>,
    /// Side length in pixels.
    size: u32,
    /// Temporal index (0-based).
    index: usize,
    /// Capture timestamp.
    timestamp: Instant,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, size: u32, index: usize) -> Self {
        Self {
            pixels,
            size,
            index,
            timestamp: Instant::now(),
        }
    }

    /// Returns the same frame tagged with another temporal index.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Creates a frame filled with a single color.
    pub fn uniform(size: u32, index: usize, rgba: [u8; 4]) -> Self {
        let count = (size as usize) * (size as usize);
        let pixels = rgba.iter().copied().cycle().take(count * FRAME_CHANNELS).collect();
        Self::new(pixels, size, index)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the frame, returning its pixel buffer.
    #[inline]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the side length.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the temporal index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the total number of pixels (size * size).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    /// Returns the RGBA value at (x, y).
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.size as usize) + x as usize) * FRAME_CHANNELS;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.size > 0 && self.pixels.len() == self.pixel_count() * FRAME_CHANNELS
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("size", &self.size)
            .field("index", &self.index)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 64 * 64 * 4];
        let frame = Frame::new(pixels, 64, 3);

        assert_eq!(frame.size(), 64);
        assert_eq!(frame.index(), 3);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 100]; // Wrong size
        let frame = Frame::new(pixels, 64, 0);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_uniform_frame() {
        let frame = Frame::uniform(4, 1, [10, 20, 30, 255]);
        assert!(frame.is_valid());
        assert_eq!(frame.pixel(3, 3), [10, 20, 30, 255]);
    }
}
