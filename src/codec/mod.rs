//! Lossless intermediate raster codec.
//!
//! Frames are spooled through this codec so a capture does not need to keep
//! every raw RGBA buffer alive until the palette is known. The stream layout
//! follows the QOI format:
//!
//! ```text
//! Header (14 bytes):
//!   Magic: "qoif" (4 bytes)
//!   Width: u32 (big-endian)
//!   Height: u32 (big-endian)
//!   Channels: u8 (3 = RGB, 4 = RGBA)
//!   Colorspace: u8 (0 = sRGB with linear alpha, 1 = all linear)
//!
//! Chunks (variable): see [`Op`]
//!
//! End marker: 00 00 00 00 00 00 00 01
//! ```

mod decoder;
mod encoder;
mod opcode;
mod spool;

pub use decoder::{decode, DecodedRaster};
pub use encoder::{encode, encode_with};
pub use opcode::{Op, MAX_RUN};
pub use spool::{FrameSpool, SpoolError};

use thiserror::Error;

/// Magic bytes opening every encoded raster.
pub const MAGIC: &[u8; 4] = b"qoif";

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 14;

/// Fixed marker closing every encoded raster.
pub const END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

/// Number of slots in the rolling color cache.
///
/// Encoder and decoder must agree on this exactly; a mismatch corrupts
/// output without any detectable signature.
pub const CACHE_SIZE: usize = 64;

/// Upper bound on decoded pixel count, guarding against hostile headers.
pub const MAX_PIXELS: u64 = 400_000_000;

/// Errors raised while encoding or decoding a raster stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The stream does not start with `qoif`.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The channel count is neither 3 nor 4.
    #[error("unsupported channel count: {0} (expected 3 or 4)")]
    UnsupportedChannels(u8),
    /// The colorspace tag is neither 0 nor 1.
    #[error("unsupported colorspace tag: {0}")]
    UnsupportedColorspace(u8),
    /// Width or height is zero, or the pixel count is too large.
    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions {
        /// Header width.
        width: u32,
        /// Header height.
        height: u32,
    },
    /// The pixel buffer does not match the header.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Bytes implied by the header.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// The stream ends inside a chunk.
    #[error("stream truncated at byte {offset}")]
    Truncated {
        /// Byte offset where input ran out.
        offset: usize,
    },
    /// The stream does not end with the end marker.
    #[error("missing end marker")]
    MissingEndMarker,
}

/// Colorspace tag stored in the header. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ColorSpace {
    /// sRGB color channels with linear alpha.
    #[default]
    Srgb = 0,
    /// All channels linear.
    Linear = 1,
}

impl ColorSpace {
    /// Parses a colorspace tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ColorSpace::Srgb),
            1 => Some(ColorSpace::Linear),
            _ => None,
        }
    }
}

/// Raster description carried by the stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Bytes per pixel (3 or 4).
    pub channels: u8,
    /// Colorspace tag.
    pub colorspace: ColorSpace,
}

impl RasterHeader {
    /// Creates an sRGB header.
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
            colorspace: ColorSpace::Srgb,
        }
    }

    /// Number of pixels described by this header.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of the raw pixel buffer in bytes.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.pixel_count() * self.channels as usize
    }

    /// Checks channel count and dimensions.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.channels != 3 && self.channels != 4 {
            return Err(FormatError::UnsupportedChannels(self.channels));
        }
        let pixels = self.width as u64 * self.height as u64;
        if self.width == 0 || self.height == 0 || pixels > MAX_PIXELS {
            return Err(FormatError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.push(self.channels);
        out.push(self.colorspace as u8);
    }

    fn read_from(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = bytes
            .get(..HEADER_SIZE)
            .ok_or(FormatError::Truncated { offset: bytes.len() })?;
        if &header[0..4] != MAGIC {
            return Err(FormatError::InvalidMagic);
        }

        let width = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let height = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let channels = header[12];
        let colorspace =
            ColorSpace::from_u8(header[13]).ok_or(FormatError::UnsupportedColorspace(header[13]))?;

        let parsed = Self {
            width,
            height,
            channels,
            colorspace,
        };
        parsed.validate()?;
        Ok(parsed)
    }
}

/// Slot in the rolling color cache for a pixel.
#[inline]
pub fn color_hash(px: [u8; 4]) -> usize {
    let [r, g, b, a] = px.map(usize::from);
    (r * 3 + g * 5 + b * 7 + a * 11) % CACHE_SIZE
}
