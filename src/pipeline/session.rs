//! Capture-to-animation session.
//!
//! A session owns the blue-noise mask, the dithering thread pool and the
//! tensor assembler. Each run captures N frames, holds them until the
//! palette exists, dithers them in parallel and assembles the cube in
//! frame order before encoding it.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{CancelToken, PipelineError, SessionProgress, SessionReport, Stage};
use crate::animation::AnimatedImageEncoder;
use crate::capture::{fit_to_cube, Camera, FileConfig, Frame, FRAME_CHANNELS};
use crate::codec::FrameSpool;
use crate::dither::{BlueNoiseMask, Ditherer};
use crate::palette::{Palette, PaletteBuilder};
use crate::tensor::{CubeTensor, TensorAssembler};

/// What a completed run produces.
#[derive(Debug)]
pub struct SessionOutput {
    /// The assembled cube.
    pub tensor: CubeTensor,
    /// The encoded GIF89a stream.
    pub gif: Vec<u8>,
    /// Statistics of the run.
    pub report: SessionReport,
}

/// Rejects a frame whose buffer does not match its declared side.
fn check_frame(frame: &Frame) -> Result<(), PipelineError> {
    if frame.is_valid() {
        return Ok(());
    }
    Err(PipelineError::InvalidFrame {
        index: frame.index(),
        expected: frame.pixel_count() * FRAME_CHANNELS,
        actual: frame.pixels().len(),
    })
}

/// Frames waiting for the palette.
enum HeldFrames {
    Spooled(FrameSpool),
    Raw(Vec<Frame>),
}

impl HeldFrames {
    fn new(spool: bool) -> Self {
        if spool {
            HeldFrames::Spooled(FrameSpool::new())
        } else {
            HeldFrames::Raw(Vec::new())
        }
    }

    fn hold(&mut self, frame: Frame) -> Result<(), PipelineError> {
        match self {
            HeldFrames::Spooled(spool) => spool.spill(&frame)?,
            HeldFrames::Raw(frames) => frames.push(frame),
        }
        Ok(())
    }

    fn len(&self) -> usize {
        match self {
            HeldFrames::Spooled(spool) => spool.len(),
            HeldFrames::Raw(frames) => frames.len(),
        }
    }

    /// (raw bytes, bytes actually held)
    fn footprint(&self) -> (usize, usize) {
        match self {
            HeldFrames::Spooled(spool) => (spool.raw_bytes(), spool.stored_bytes()),
            HeldFrames::Raw(frames) => {
                let bytes = frames.iter().map(|f| f.pixels().len()).sum();
                (bytes, bytes)
            }
        }
    }

    /// Splits the held frames into batches of at most `batch` frames in
    /// index order. Spooled frames stay encoded until their batch is taken.
    fn into_batches(self, batch: usize) -> Batches {
        match self {
            HeldFrames::Spooled(spool) => {
                let order: Vec<usize> = spool.indices().collect();
                Batches::Spooled { spool, order, next: 0, batch }
            }
            HeldFrames::Raw(mut frames) => {
                frames.sort_by_key(Frame::index);
                Batches::Raw { frames: frames.into_iter(), batch }
            }
        }
    }
}

enum Batches {
    Spooled {
        spool: FrameSpool,
        order: Vec<usize>,
        next: usize,
        batch: usize,
    },
    Raw {
        frames: std::vec::IntoIter<Frame>,
        batch: usize,
    },
}

impl Batches {
    fn next_batch(&mut self) -> Result<Vec<Frame>, PipelineError> {
        match self {
            Batches::Spooled { spool, order, next, batch } => {
                let end = (*next + *batch).min(order.len());
                let frames = order[*next..end]
                    .iter()
                    .map(|&i| spool.take(i))
                    .collect::<Result<Vec<_>, _>>()?;
                *next = end;
                Ok(frames)
            }
            Batches::Raw { frames, batch } => Ok(frames.by_ref().take(*batch).collect()),
        }
    }
}

/// Runs captures through palette, dither, assembly and encoding.
pub struct CubeSession {
    config: FileConfig,
    mask: Arc<BlueNoiseMask>,
    pool: rayon::ThreadPool,
    builder: PaletteBuilder,
    encoder: AnimatedImageEncoder,
    assembler: TensorAssembler,
    palette: Option<Arc<Palette>>,
    cancel: CancelToken,
}

impl CubeSession {
    /// Validates the configuration and builds the mask and thread pool.
    pub fn new(config: FileConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let started = Instant::now();
        let mask = Arc::new(BlueNoiseMask::generate(&config.dither.mask)?);
        debug!(
            width = mask.width(),
            height = mask.height(),
            depth = mask.depth(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated blue-noise mask"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.cube.workers)
            .thread_name(|i| format!("dither-{i}"))
            .build()?;

        let builder = PaletteBuilder::new(config.palette.clone())?;
        let encoder = AnimatedImageEncoder::new(config.output.clone())?;

        info!(
            size = config.cube.size,
            workers = pool.current_num_threads(),
            spool = config.cube.spool_frames,
            "Session ready"
        );

        Ok(Self {
            config,
            mask,
            pool,
            builder,
            encoder,
            assembler: TensorAssembler::new(),
            palette: None,
            cancel: CancelToken::new(),
        })
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// A handle that cancels this session's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns the shared blue-noise mask.
    pub fn mask(&self) -> &Arc<BlueNoiseMask> {
        &self.mask
    }

    /// The palette of the most recent successful palette build.
    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    fn cube_size(&self) -> usize {
        self.config.cube.size as usize
    }

    fn check_cancel(&mut self, stage: &str) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            self.assembler.reset();
            warn!(stage, "Session cancelled");
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// Captures N frames from `camera` and turns them into a cube.
    ///
    /// Frames are tagged with their capture position, so the k-th frame
    /// delivered becomes slice k. The camera is opened if needed and left
    /// open afterwards.
    pub fn run(&mut self, camera: &mut dyn Camera) -> Result<SessionOutput, PipelineError> {
        self.run_with_callback(camera, |_| {})
    }

    /// [`run`](Self::run), reporting progress after every captured frame
    /// and every dithered batch.
    pub fn run_with_callback<F>(
        &mut self,
        camera: &mut dyn Camera,
        callback: F,
    ) -> Result<SessionOutput, PipelineError>
    where
        F: Fn(&SessionProgress),
    {
        let started = Instant::now();
        let n = self.cube_size();
        let mut report = SessionReport::new(n, self.config.cube.spool_frames);

        if !camera.is_open() {
            camera.open(&self.config.capture)?;
        }

        let mut held = HeldFrames::new(self.config.cube.spool_frames);
        let mut samples = Vec::new();
        for position in 0..n {
            self.check_cancel("capture")?;
            let captured = camera.capture()?;
            check_frame(&captured)?;
            let frame = fit_to_cube(&captured, n as u32).with_index(position);
            self.builder.sample_frame(frame.pixels(), &mut samples);
            held.hold(frame)?;
            callback(&SessionProgress {
                stage: Stage::Capture,
                done: position + 1,
                total: n,
            });
        }
        report.capture_ms = started.elapsed().as_millis() as u64;
        info!(frames = n, elapsed_ms = report.capture_ms, "Capture complete");

        self.complete(held, samples, report, started, &callback)
    }

    /// Turns externally captured frames into a cube.
    ///
    /// Frames may come in any order but must carry indices `0..N` exactly
    /// once. Frames of another side length are fitted first.
    pub fn process(&mut self, frames: Vec<Frame>) -> Result<SessionOutput, PipelineError> {
        self.process_with_callback(frames, |_| {})
    }

    /// [`process`](Self::process) with a progress callback.
    pub fn process_with_callback<F>(
        &mut self,
        frames: Vec<Frame>,
        callback: F,
    ) -> Result<SessionOutput, PipelineError>
    where
        F: Fn(&SessionProgress),
    {
        let started = Instant::now();
        let n = self.cube_size();
        let mut report = SessionReport::new(n, self.config.cube.spool_frames);

        let mut held = HeldFrames::new(self.config.cube.spool_frames);
        let mut samples = Vec::new();
        let total = frames.len();
        for (done, frame) in frames.into_iter().enumerate() {
            self.check_cancel("ingest")?;
            check_frame(&frame)?;
            let frame = if frame.size() as usize == n {
                frame
            } else {
                fit_to_cube(&frame, n as u32)
            };
            self.builder.sample_frame(frame.pixels(), &mut samples);
            held.hold(frame)?;
            callback(&SessionProgress {
                stage: Stage::Capture,
                done: done + 1,
                total,
            });
        }
        report.capture_ms = started.elapsed().as_millis() as u64;

        self.complete(held, samples, report, started, &callback)
    }

    fn complete(
        &mut self,
        held: HeldFrames,
        samples: Vec<[u8; 3]>,
        mut report: SessionReport,
        started: Instant,
        callback: &dyn Fn(&SessionProgress),
    ) -> Result<SessionOutput, PipelineError> {
        let (raw_bytes, held_bytes) = held.footprint();
        report.raw_frame_bytes = raw_bytes;
        report.held_frame_bytes = held_bytes;
        report.frames = held.len();
        if self.config.cube.spool_frames {
            debug!(
                raw = raw_bytes,
                stored = held_bytes,
                ratio = report.spool_ratio(),
                "Frames spooled"
            );
        }

        self.check_cancel("palette")?;
        let stage = Instant::now();
        let (palette, build) = self.builder.build(&samples)?;
        drop(samples);
        let palette = Arc::new(palette);
        report.record_palette(palette.len(), &build);
        report.palette_ms = stage.elapsed().as_millis() as u64;
        self.palette = Some(Arc::clone(&palette));
        info!(
            entries = palette.len(),
            distinct = build.distinct_colors,
            elapsed_ms = report.palette_ms,
            "Palette built"
        );

        let stage = Instant::now();
        let tensor = match self.assemble(held, palette, callback) {
            Ok(tensor) => tensor,
            Err(e) => {
                self.assembler.reset();
                return Err(e);
            }
        };
        report.dither_ms = stage.elapsed().as_millis() as u64;
        info!(
            voxels = tensor.voxel_count(),
            elapsed_ms = report.dither_ms,
            "Cube assembled"
        );

        self.check_cancel("encode")?;
        let stage = Instant::now();
        let gif = self.encoder.encode(&tensor)?;
        report.encoded_bytes = gif.len();
        report.encode_ms = stage.elapsed().as_millis() as u64;
        report.total_ms = started.elapsed().as_millis() as u64;
        info!(
            bytes = gif.len(),
            elapsed_ms = report.encode_ms,
            total_ms = report.total_ms,
            "Animation encoded"
        );

        Ok(SessionOutput {
            tensor,
            gif,
            report,
        })
    }

    fn assemble(
        &mut self,
        held: HeldFrames,
        palette: Arc<Palette>,
        callback: &dyn Fn(&SessionProgress),
    ) -> Result<CubeTensor, PipelineError> {
        let keep_raw = self.config.cube.keep_raw_tensor;
        let ditherer = Ditherer::new(Arc::clone(&self.mask), Arc::clone(&palette), &self.config.dither)?;
        self.assembler.start(self.cube_size(), palette, keep_raw)?;

        let batch_size = self.pool.current_num_threads().max(1);
        let mut batches = held.into_batches(batch_size);
        loop {
            self.check_cancel("dither")?;
            let batch = batches.next_batch()?;
            if batch.is_empty() {
                break;
            }

            let planes = self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|frame| ditherer.dither_frame(frame))
                    .collect::<Result<Vec<_>, _>>()
            })?;

            for (frame, plane) in batch.into_iter().zip(planes) {
                let index = frame.index();
                if keep_raw {
                    self.assembler.ingest_with_raw(index, plane, frame.into_pixels())?;
                } else {
                    self.assembler.ingest(index, plane)?;
                }
            }
            debug!(
                ingested = self.assembler.ingested(),
                missing = self.assembler.missing(),
                "Dithered batch"
            );
            callback(&SessionProgress {
                stage: Stage::Dither,
                done: self.assembler.ingested(),
                total: self.cube_size(),
            });
        }

        Ok(self.assembler.finalize()?)
    }
}

impl std::fmt::Debug for CubeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeSession")
            .field("size", &self.config.cube.size)
            .field("workers", &self.pool.current_num_threads())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
