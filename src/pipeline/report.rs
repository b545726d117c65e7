//! Per-session processing statistics.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::palette::BuildReport;

/// Stage a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Frames captured or handed in and held for the palette.
    Capture,
    /// Frames dithered and recorded in the cube.
    Dither,
}

/// Progress of a running session, passed to session callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    /// Stage the update belongs to.
    pub stage: Stage,
    /// Frames finished in this stage so far.
    pub done: usize,
    /// Frames the stage expects.
    pub total: usize,
}

/// A snapshot of what one session did and how long each stage took.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// When the session started.
    pub started_at: DateTime<Local>,
    /// Cube side N.
    pub cube_size: usize,
    /// Frames dithered into the cube.
    pub frames: usize,
    /// Entries in the published palette.
    pub palette_size: usize,
    /// Distinct colors seen while sampling.
    pub distinct_colors: usize,
    /// Complement entries added to the palette.
    pub complements_added: usize,
    /// Largest ΔE of any merged color.
    pub max_merge_error: f32,
    /// Whether frames went through the lossless spool.
    pub spooled: bool,
    /// Raw RGBA bytes held while waiting for the palette.
    pub raw_frame_bytes: usize,
    /// Bytes actually held (encoded when spooled).
    pub held_frame_bytes: usize,
    /// Size of the encoded animation.
    pub encoded_bytes: usize,
    /// Time spent capturing and holding frames.
    pub capture_ms: u64,
    /// Time spent building the palette.
    pub palette_ms: u64,
    /// Time spent dithering and assembling.
    pub dither_ms: u64,
    /// Time spent encoding the animation.
    pub encode_ms: u64,
    /// Wall time of the whole run.
    pub total_ms: u64,
}

impl SessionReport {
    pub(crate) fn new(cube_size: usize, spooled: bool) -> Self {
        Self {
            started_at: Local::now(),
            cube_size,
            frames: 0,
            palette_size: 0,
            distinct_colors: 0,
            complements_added: 0,
            max_merge_error: 0.0,
            spooled,
            raw_frame_bytes: 0,
            held_frame_bytes: 0,
            encoded_bytes: 0,
            capture_ms: 0,
            palette_ms: 0,
            dither_ms: 0,
            encode_ms: 0,
            total_ms: 0,
        }
    }

    pub(crate) fn record_palette(&mut self, palette_size: usize, build: &BuildReport) {
        self.palette_size = palette_size;
        self.distinct_colors = build.distinct_colors;
        self.complements_added = build.complements_added;
        self.max_merge_error = build.max_merge_error;
    }

    /// Raw frame bytes divided by held bytes.
    pub fn spool_ratio(&self) -> f64 {
        if self.held_frame_bytes == 0 {
            1.0
        } else {
            self.raw_frame_bytes as f64 / self.held_frame_bytes as f64
        }
    }

    /// Renders the report as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
