//! Chroma Cube CLI
//!
//! Captures a frame sequence from the mock camera, turns it into a dithered
//! voxel cube and writes the cube as an animated GIF. Also inspects GIF
//! output and runs rasters through the intermediate codec.

use std::path::{Path, PathBuf};

use chroma_cube::{
    animation::inspect,
    capture::{FileConfig, MockCamera},
    codec,
    color::DistanceMetric,
    pipeline::CubeSession,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Metric {
    /// Euclidean distance in L*a*b*
    Cie76,
    /// CIEDE2000 (slower, more uniform)
    Ciede2000,
}

impl Metric {
    fn to_distance_metric(self) -> DistanceMetric {
        match self {
            Metric::Cie76 => DistanceMetric::Cie76,
            Metric::Ciede2000 => DistanceMetric::Ciede2000,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chroma-cube")]
#[command(author, version, about = "Blue-noise dithered voxel cubes from frame sequences", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture N frames from the mock camera and write the cube as a GIF
    Capture {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output GIF path (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cube side length N
        #[arg(short, long)]
        size: Option<u32>,

        /// Maximum palette size
        #[arg(long)]
        colors: Option<usize>,

        /// Capture rate; also sets the slice delay
        #[arg(long)]
        fps: Option<u32>,

        /// Dither worker threads (0 = one per core)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Color difference metric
        #[arg(long, value_enum)]
        metric: Option<Metric>,

        /// Mock sensor seed
        #[arg(long)]
        seed: Option<u64>,

        /// Keep raw frames in memory instead of spooling them
        #[arg(long)]
        no_spool: bool,

        /// Write the session report as TOML
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the structure of a GIF file
    Inspect {
        /// GIF file to read
        input: PathBuf,

        /// Also print each frame's delay and compressed size
        #[arg(short, long)]
        frames: bool,
    },

    /// Run a raster through the intermediate codec
    Spool {
        #[command(subcommand)]
        action: SpoolAction,
    },
}

#[derive(Subcommand, Debug)]
enum SpoolAction {
    /// Encode a raw pixel buffer
    Encode {
        /// Raw row-major pixel bytes
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// 3 (RGB) or 4 (RGBA)
        #[arg(long, default_value_t = 4)]
        channels: u8,
    },
    /// Decode an encoded raster back to raw bytes
    Decode { input: PathBuf, output: PathBuf },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Capture {
            config,
            output,
            size,
            colors,
            fps,
            workers,
            metric,
            seed,
            no_spool,
            report,
        } => {
            let overrides = Overrides {
                size,
                colors,
                fps,
                workers,
                metric,
                seed,
                no_spool,
            };
            capture(config.as_deref(), overrides, output, report.as_deref())
        }
        Command::Inspect { input, frames } => inspect_file(&input, frames),
        Command::Spool { action } => spool(action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Overrides {
    size: Option<u32>,
    colors: Option<usize>,
    fps: Option<u32>,
    workers: Option<usize>,
    metric: Option<Metric>,
    seed: Option<u64>,
    no_spool: bool,
}

impl Overrides {
    fn apply(self, config: &mut FileConfig) {
        if let Some(size) = self.size {
            config.cube.size = size;
        }
        if let Some(colors) = self.colors {
            config.palette.max_size = colors;
        }
        if let Some(fps) = self.fps {
            config.set_fps(fps);
        }
        if let Some(workers) = self.workers {
            config.cube.workers = workers;
        }
        if let Some(metric) = self.metric {
            config.dither.metric = metric.to_distance_metric();
        }
        if let Some(seed) = self.seed {
            config.capture.seed = seed;
        }
        if self.no_spool {
            config.cube.spool_frames = false;
        }
    }
}

fn capture(
    config_path: Option<&Path>,
    overrides: Overrides,
    output: Option<PathBuf>,
    report_path: Option<&Path>,
) -> CliResult {
    let mut config = match config_path {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    overrides.apply(&mut config);

    info!("Chroma Cube v{}", chroma_cube::VERSION);
    info!("Capturing from mock camera");

    let mut session = CubeSession::new(config)?;
    let token = session.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let mut camera = MockCamera::new();
    let result = session.run(&mut camera)?;

    let output = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "cube-{}.gif",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ))
    });
    std::fs::write(&output, &result.gif)?;
    info!(
        "Wrote {} ({} bytes, {} colors, {} frames)",
        output.display(),
        result.gif.len(),
        result.report.palette_size,
        result.tensor.size
    );

    if let Some(path) = report_path {
        std::fs::write(path, result.report.to_toml()?)?;
        info!("Wrote report to {}", path.display());
    }

    Ok(())
}

fn inspect_file(path: &Path, show_frames: bool) -> CliResult {
    let bytes = std::fs::read(path)?;
    let summary = inspect(&bytes)?;

    println!("GIF{} {}x{}", summary.version, summary.width, summary.height);
    println!("Global color table: {} entries", summary.global_table_size);
    match summary.loop_count {
        Some(count) if count.to_wire() == 0 => println!("Loops: forever"),
        Some(count) => println!("Loops: {}", count.to_wire()),
        None => println!("Loops: none"),
    }
    println!("Frames: {}", summary.frames.len());
    println!("Total bytes: {}", summary.total_bytes);

    if show_frames {
        for (i, frame) in summary.frames.iter().enumerate() {
            println!(
                "  #{:<4} {}x{} delay={}cs disposal={:?} lzw={} bytes",
                i, frame.width, frame.height, frame.delay_cs, frame.disposal, frame.compressed_bytes
            );
        }
    }

    Ok(())
}

fn spool(action: SpoolAction) -> CliResult {
    match action {
        SpoolAction::Encode {
            input,
            output,
            width,
            height,
            channels,
        } => {
            let pixels = std::fs::read(&input)?;
            let encoded = codec::encode(&pixels, width, height, channels)?;
            std::fs::write(&output, &encoded)?;
            info!(
                "Encoded {}x{} ({} -> {} bytes)",
                width,
                height,
                pixels.len(),
                encoded.len()
            );
        }
        SpoolAction::Decode { input, output } => {
            let bytes = std::fs::read(&input)?;
            let raster = codec::decode(&bytes)?;
            std::fs::write(&output, &raster.pixels)?;
            info!(
                "Decoded {}x{} with {} channels ({} bytes)",
                raster.width(),
                raster.height(),
                raster.channels(),
                raster.pixels.len()
            );
        }
    }
    Ok(())
}
