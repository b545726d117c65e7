//! GIF89a serialization of a voxel tensor.
//!
//! ```text
//! "GIF89a"
//! Logical screen descriptor (N×N, global table)
//! Global color table (power-of-two size, padded with black)
//! NETSCAPE2.0 application extension (loop count)
//! Per z-slice:
//!   Graphic control extension (disposal, delay)
//!   Image descriptor (0, 0, N, N, no local table)
//!   LZW minimum code size + sub-blocked image data
//! Trailer 0x3B
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::lzw::{compress, write_sub_blocks};
use super::EncodingError;
use crate::tensor::{CubeTensor, MAX_CUBE_SIZE};

/// Signature and version opening every stream.
pub const GIF_SIGNATURE: &[u8; 6] = b"GIF89a";

/// Byte closing every stream.
pub const GIF_TRAILER: u8 = 0x3B;

const EXTENSION_INTRODUCER: u8 = 0x21;
const APPLICATION_LABEL: u8 = 0xFF;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const IMAGE_SEPARATOR: u8 = 0x2C;
const NETSCAPE_ID: &[u8; 11] = b"NETSCAPE2.0";

/// What a viewer does with a frame before drawing the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DisposalMethod {
    /// No disposal specified.
    Unspecified = 0,
    /// Leave the frame in place.
    #[default]
    Keep = 1,
    /// Clear to the background color.
    Background = 2,
    /// Restore what was there before the frame.
    Previous = 3,
}

impl DisposalMethod {
    /// Parses the 3-bit disposal field of a graphic control extension.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(DisposalMethod::Unspecified),
            1 => Some(DisposalMethod::Keep),
            2 => Some(DisposalMethod::Background),
            3 => Some(DisposalMethod::Previous),
            _ => None,
        }
    }
}

/// How many times the animation repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopCount {
    /// Repeat forever.
    #[default]
    Infinite,
    /// Play this many extra times.
    Finite(u16),
}

impl LoopCount {
    /// Value stored in the NETSCAPE2.0 block (0 = forever).
    pub fn to_wire(self) -> u16 {
        match self {
            LoopCount::Infinite => 0,
            LoopCount::Finite(n) => n,
        }
    }

    /// Parses the NETSCAPE2.0 loop value.
    pub fn from_wire(v: u16) -> Self {
        if v == 0 {
            LoopCount::Infinite
        } else {
            LoopCount::Finite(v)
        }
    }
}

/// Output settings for the animated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Delay between slices in centiseconds.
    pub frame_delay_cs: u16,
    /// Disposal method written for every slice.
    pub disposal: DisposalMethod,
    /// Loop count written to the NETSCAPE2.0 block.
    pub loop_count: LoopCount,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_delay_cs: delay_from_fps(25),
            disposal: DisposalMethod::Keep,
            loop_count: LoopCount::Infinite,
        }
    }
}

impl AnimationConfig {
    /// Validates the output options.
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.loop_count == LoopCount::Finite(0) {
            return Err(EncodingError::InvalidOptions(
                "finite loop count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Frame delay in centiseconds for a playback rate, never below 1.
pub fn delay_from_fps(fps: u32) -> u16 {
    let fps = fps.max(1);
    ((100 + fps / 2) / fps).clamp(1, u16::MAX as u32) as u16
}

/// Number of bits addressing a table of at least `palette_size` colors.
pub fn table_bits(palette_size: usize) -> u8 {
    let mut bits = 1u8;
    while (1usize << bits) < palette_size && bits < 8 {
        bits += 1;
    }
    bits
}

/// Rough upper estimate of the encoded size, for buffer planning.
pub fn estimate_encoded_size(size: usize, palette_size: usize) -> usize {
    let table = 3usize << table_bits(palette_size);
    let area = size * size;
    let per_frame = 8 + 10 + 1 + area / 2 + area / 2 / 255 + 2;
    GIF_SIGNATURE.len() + 7 + table + 19 + size * per_frame + 1 + 1024
}

/// Serializes tensors as looping GIF animations.
#[derive(Debug, Clone, Default)]
pub struct AnimatedImageEncoder {
    config: AnimationConfig,
}

impl AnimatedImageEncoder {
    /// Creates an encoder after validating its options.
    pub fn new(config: AnimationConfig) -> Result<Self, EncodingError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the output options.
    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Encodes every z-slice of `tensor` as one frame.
    ///
    /// The stream is built in a private buffer and only returned once
    /// complete.
    pub fn encode(&self, tensor: &CubeTensor) -> Result<Vec<u8>, EncodingError> {
        let n = tensor.size;
        let palette_size = tensor.palette_size();
        validate_tensor(tensor)?;

        let bits = table_bits(palette_size);
        let min_code_size = bits.max(2);

        // Slices are independent, so their LZW streams compress in parallel.
        let area = n * n;
        let slices: Vec<Vec<u8>> = tensor
            .indices
            .par_chunks(area)
            .map(|slice| compress(slice, min_code_size))
            .collect();

        let mut out = Vec::with_capacity(estimate_encoded_size(n, palette_size));
        out.extend_from_slice(GIF_SIGNATURE);
        self.write_screen(&mut out, n as u16, bits, tensor);
        self.write_loop(&mut out);

        for data in &slices {
            self.write_frame(&mut out, n as u16, min_code_size, data);
        }
        out.push(GIF_TRAILER);

        tracing::debug!(
            size = n,
            palette_size,
            frames = slices.len(),
            bytes = out.len(),
            "Encoded animation"
        );
        Ok(out)
    }

    fn write_screen(&self, out: &mut Vec<u8>, n: u16, bits: u8, tensor: &CubeTensor) {
        out.extend_from_slice(&n.to_le_bytes());
        out.extend_from_slice(&n.to_le_bytes());
        // Global table present, 8-bit color resolution, table size.
        out.push(0x80 | (7 << 4) | (bits - 1));
        out.push(0); // background color index
        out.push(0); // pixel aspect ratio

        let table_size = 1usize << bits;
        for entry in tensor.palette.entries() {
            out.extend_from_slice(&entry.rgb);
        }
        out.resize(out.len() + (table_size - tensor.palette_size()) * 3, 0);
    }

    fn write_loop(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[EXTENSION_INTRODUCER, APPLICATION_LABEL, 0x0B]);
        out.extend_from_slice(NETSCAPE_ID);
        out.extend_from_slice(&[0x03, 0x01]);
        out.extend_from_slice(&self.config.loop_count.to_wire().to_le_bytes());
        out.push(0);
    }

    fn write_frame(&self, out: &mut Vec<u8>, n: u16, min_code_size: u8, data: &[u8]) {
        out.extend_from_slice(&[EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, 0x04]);
        out.push((self.config.disposal as u8) << 2);
        out.extend_from_slice(&self.config.frame_delay_cs.to_le_bytes());
        out.push(0); // transparent color index (unused)
        out.push(0);

        out.push(IMAGE_SEPARATOR);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&n.to_le_bytes());
        out.extend_from_slice(&n.to_le_bytes());
        out.push(0); // no local table, not interlaced

        out.push(min_code_size);
        write_sub_blocks(data, out);
    }
}

fn validate_tensor(tensor: &CubeTensor) -> Result<(), EncodingError> {
    let n = tensor.size;
    let palette_size = tensor.palette_size();

    if !(2..=256).contains(&palette_size) {
        return Err(EncodingError::InvalidPaletteSize(palette_size));
    }
    if n == 0 || n > MAX_CUBE_SIZE {
        return Err(EncodingError::InvalidSize(n));
    }
    let expected = n
        .checked_pow(3)
        .ok_or(EncodingError::InvalidSize(n))?;
    if tensor.indices.len() != expected {
        return Err(EncodingError::IndexCountMismatch {
            expected,
            actual: tensor.indices.len(),
        });
    }
    if let Some(pos) = tensor.indices.iter().position(|&i| i as usize >= palette_size) {
        return Err(EncodingError::IndexOutOfRange {
            position: pos,
            index: tensor.indices[pos],
            palette_size,
        });
    }
    Ok(())
}

/// Encodes with default options.
pub fn encode(tensor: &CubeTensor) -> Result<Vec<u8>, EncodingError> {
    AnimatedImageEncoder::default().encode(tensor)
}
