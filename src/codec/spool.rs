//! In-memory spill area for captured frames.
//!
//! Between capture and dithering every frame has to wait for the palette.
//! The spool keeps each one losslessly encoded instead of as raw RGBA.

use std::collections::BTreeMap;

use super::{decode, encode, FormatError};
use crate::capture::{Frame, FRAME_CHANNELS};
use thiserror::Error;

/// Errors raised by the frame spool.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// The frame index is already stored.
    #[error("frame {0} is already spooled")]
    Duplicate(usize),
    /// No frame is stored under the index.
    #[error("frame {0} is not in the spool")]
    Missing(usize),
    /// A stored frame failed to decode.
    #[error("spooled frame is malformed: {0}")]
    Format(#[from] FormatError),
}

/// Encoded frames keyed by temporal index.
#[derive(Debug, Default)]
pub struct FrameSpool {
    frames: BTreeMap<usize, Vec<u8>>,
    raw_bytes: usize,
}

impl FrameSpool {
    /// Creates an empty spool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes and stores a frame. An index can only be spilled once.
    pub fn spill(&mut self, frame: &Frame) -> Result<(), SpoolError> {
        if self.frames.contains_key(&frame.index()) {
            return Err(SpoolError::Duplicate(frame.index()));
        }

        let encoded = encode(
            frame.pixels(),
            frame.size(),
            frame.size(),
            FRAME_CHANNELS as u8,
        )?;
        self.raw_bytes += frame.pixels().len();

        tracing::trace!(
            index = frame.index(),
            raw = frame.pixels().len(),
            stored = encoded.len(),
            "Spooled frame"
        );
        self.frames.insert(frame.index(), encoded);
        Ok(())
    }

    /// Decodes a stored frame without removing it.
    pub fn restore(&self, index: usize) -> Result<Frame, SpoolError> {
        let bytes = self.frames.get(&index).ok_or(SpoolError::Missing(index))?;
        Self::to_frame(bytes, index)
    }

    /// Decodes a stored frame and drops it from the spool.
    pub fn take(&mut self, index: usize) -> Result<Frame, SpoolError> {
        let bytes = self.frames.remove(&index).ok_or(SpoolError::Missing(index))?;
        let frame = Self::to_frame(&bytes, index)?;
        self.raw_bytes = self.raw_bytes.saturating_sub(frame.pixels().len());
        Ok(frame)
    }

    fn to_frame(bytes: &[u8], index: usize) -> Result<Frame, SpoolError> {
        let raster = decode(bytes)?;
        if raster.channels() as usize != FRAME_CHANNELS || raster.width() != raster.height() {
            return Err(SpoolError::Format(FormatError::InvalidDimensions {
                width: raster.width(),
                height: raster.height(),
            }));
        }
        let size = raster.width();
        Ok(Frame::new(raster.pixels, size, index))
    }

    /// Indices currently held, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.frames.keys().copied()
    }

    /// Encoded stream of a stored frame.
    pub fn encoded(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(&index).map(Vec::as_slice)
    }

    /// Returns the number of stored frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frames are stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total encoded bytes held.
    pub fn stored_bytes(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// Total raw RGBA bytes the held frames represent.
    pub fn raw_bytes(&self) -> usize {
        self.raw_bytes
    }

    /// Raw size divided by stored size (1.0 when empty).
    pub fn compression_ratio(&self) -> f64 {
        let stored = self.stored_bytes();
        if stored == 0 {
            1.0
        } else {
            self.raw_bytes as f64 / stored as f64
        }
    }
}
