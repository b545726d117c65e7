//! Ordered accumulation of index planes into a cube.

use std::sync::Arc;

use super::{AssemblyError, CubeTensor, MAX_CUBE_SIZE};
use crate::capture::FRAME_CHANNELS;
use crate::palette::Palette;

#[derive(Debug)]
struct Assembly {
    size: usize,
    palette: Arc<Palette>,
    keep_raw: bool,
    planes: Vec<Option<Vec<u8>>>,
    raw: Vec<Option<Vec<u8>>>,
    ingested: usize,
}

/// Collects one index plane per temporal position.
///
/// Planes may arrive in any order; each lands at the z-slice named by its
/// frame index. A session owns its assembler, so `ingest` and `finalize`
/// never overlap.
#[derive(Debug, Default)]
pub struct TensorAssembler {
    state: Option<Assembly>,
}

impl TensorAssembler {
    /// Creates an idle assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new cube of side `size`, discarding any partial one.
    pub fn start(
        &mut self,
        size: usize,
        palette: Arc<Palette>,
        keep_raw: bool,
    ) -> Result<(), AssemblyError> {
        if size == 0 || size > MAX_CUBE_SIZE {
            return Err(AssemblyError::InvalidDimensions(size));
        }

        self.state = Some(Assembly {
            size,
            palette,
            keep_raw,
            planes: vec![None; size],
            raw: if keep_raw { vec![None; size] } else { Vec::new() },
            ingested: 0,
        });
        tracing::debug!(size, keep_raw, "Started tensor assembly");
        Ok(())
    }

    /// Records the index plane of frame `frame_index`.
    pub fn ingest(&mut self, frame_index: usize, plane: Vec<u8>) -> Result<(), AssemblyError> {
        self.record(frame_index, plane, None)
    }

    /// Records an index plane together with the frame's RGBA bytes.
    ///
    /// The raw bytes are dropped when the cube was started without
    /// `keep_raw`.
    pub fn ingest_with_raw(
        &mut self,
        frame_index: usize,
        plane: Vec<u8>,
        raw: Vec<u8>,
    ) -> Result<(), AssemblyError> {
        self.record(frame_index, plane, Some(raw))
    }

    fn record(
        &mut self,
        index: usize,
        plane: Vec<u8>,
        raw: Option<Vec<u8>>,
    ) -> Result<(), AssemblyError> {
        let state = self.state.as_mut().ok_or(AssemblyError::NotStarted)?;
        let size = state.size;

        if index >= size {
            return Err(AssemblyError::FrameOutOfRange { index, size });
        }
        if state.planes[index].is_some() {
            return Err(AssemblyError::DuplicateFrame(index));
        }

        let area = size * size;
        if plane.len() != area {
            return Err(AssemblyError::InvalidPlane {
                index,
                reason: format!("plane holds {} indices, expected {area}", plane.len()),
            });
        }
        let palette_size = state.palette.len();
        if let Some(&bad) = plane.iter().find(|&&i| i as usize >= palette_size) {
            return Err(AssemblyError::InvalidPlane {
                index,
                reason: format!("index {bad} exceeds palette size {palette_size}"),
            });
        }

        if state.keep_raw {
            let raw = raw.ok_or_else(|| AssemblyError::InvalidPlane {
                index,
                reason: "raw pixels required".into(),
            })?;
            if raw.len() != area * FRAME_CHANNELS {
                return Err(AssemblyError::InvalidPlane {
                    index,
                    reason: format!(
                        "raw frame holds {} bytes, expected {}",
                        raw.len(),
                        area * FRAME_CHANNELS
                    ),
                });
            }
            state.raw[index] = Some(raw);
        }

        state.planes[index] = Some(plane);
        state.ingested += 1;
        tracing::trace!(index, ingested = state.ingested, "Ingested plane");
        Ok(())
    }

    /// Whether a cube is in progress.
    pub fn is_started(&self) -> bool {
        self.state.is_some()
    }

    /// Number of planes recorded so far.
    pub fn ingested(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.ingested)
    }

    /// Number of planes still missing.
    pub fn missing(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.size - s.ingested)
    }

    /// Produces the tensor once every plane is present.
    ///
    /// On success the assembler is reset; on failure it is left untouched.
    pub fn finalize(&mut self) -> Result<CubeTensor, AssemblyError> {
        let state = self.state.as_ref().ok_or(AssemblyError::NotStarted)?;
        if state.ingested < state.size {
            return Err(AssemblyError::IncompleteCapture {
                missing: state.size - state.ingested,
                size: state.size,
            });
        }

        let Some(state) = self.state.take() else {
            return Err(AssemblyError::NotStarted);
        };
        let size = state.size;
        let indices: Vec<u8> = state.planes.into_iter().flatten().flatten().collect();
        let raw = state
            .keep_raw
            .then(|| state.raw.into_iter().flatten().flatten().collect::<Vec<u8>>());

        tracing::debug!(size, voxels = indices.len(), "Finalized tensor");
        Ok(CubeTensor {
            size,
            indices,
            palette: state.palette,
            raw,
        })
    }

    /// Discards any partial cube.
    pub fn reset(&mut self) {
        if let Some(state) = self.state.take() {
            tracing::debug!(
                size = state.size,
                discarded = state.ingested,
                "Reset tensor assembly"
            );
        }
    }
}
