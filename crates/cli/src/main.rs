use std::path::PathBuf;
use std::process;

use clap::Parser;

use facewatch_core::capture::domain::access_gate::AccessGate;
use facewatch_core::capture::domain::frame_sink::FrameSink;
use facewatch_core::capture::infrastructure::image_file_sink::ImageFileSink;
use facewatch_core::capture::infrastructure::null_sink::NullFrameSink;
use facewatch_core::pipeline::pipeline_controller::PipelineController;
use facewatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facewatch_core::shared::constants::CASCADE_MODEL_NAME;
use facewatch_core::shared::model_resolver;
use facewatch_core::shared::settings::{PipelineSettings, SourceSelector};

/// Real-time face detection over an image sequence or a synthetic camera.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Settings file (JSON). Flags below override individual fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of frames to replay in file-name order.
    #[arg(long, conflicts_with = "synthetic")]
    source: Option<PathBuf>,

    /// Generate WIDTHxHEIGHT frames with a moving target instead.
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    synthetic: Option<String>,

    /// Number of synthetic frames.
    #[arg(long, default_value = "100")]
    frames: usize,

    /// Cascade model file, native JSON or OpenCV Haar XML (defaults to the
    /// installed model).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory holding the bundled cascade model.
    #[arg(long)]
    bundled_dir: Option<PathBuf>,

    /// Write annotated frames as PNGs to this directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Smallest window as a fraction of the frame's shorter side (0.0-1.0].
    #[arg(long)]
    min_size: Option<f64>,

    /// Growth factor between scales (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Raw windows needed to report a detection.
    #[arg(long)]
    min_neighbors: Option<usize>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long)]
    skip_frames: Option<usize>,

    /// Detect on frames shrunk by this integer factor.
    #[arg(long)]
    downscale: Option<u32>,

    /// Capture on a separate thread, dropping frames while detection is busy.
    #[arg(long)]
    threaded: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = build_settings(&cli)?;

    let sink: Box<dyn FrameSink> = match &cli.output {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Box::new(ImageFileSink::new(dir))
        }
        None => Box::new(NullFrameSink::new()),
    };

    let mut controller =
        PipelineController::from_settings(&settings, AccessGate::granted(), sink)?
            .with_logger(Box::new(StdoutPipelineLogger::default()));

    let bundled_dir = cli.bundled_dir.clone().or_else(default_bundled_dir);
    match model_resolver::resolve(
        CASCADE_MODEL_NAME,
        settings.model_path.as_deref(),
        bundled_dir.as_deref(),
    ) {
        // A failed load leaves the pipeline in passthrough; the run still goes ahead.
        Ok(path) => {
            if let Err(e) = controller.load_model(&path) {
                log::warn!(
                    "Cannot use cascade model {}, frames pass through unannotated: {e}",
                    path.display()
                );
            }
        }
        Err(e) => log::warn!("No cascade model available, frames pass through unannotated: {e}"),
    }

    let stats = controller.run()?;
    log::info!(
        "Delivered {} frames ({} dropped)",
        stats.delivered,
        stats.dropped
    );
    if let Some(dir) = &cli.output {
        log::info!("Annotated frames written to {}", dir.display());
    }
    controller.teardown();
    Ok(())
}

fn build_settings(cli: &Cli) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => PipelineSettings::load(path)?,
        None => PipelineSettings::default(),
    };

    if let Some(path) = &cli.source {
        settings.source = SourceSelector::Directory { path: path.clone() };
    } else if let Some(size) = &cli.synthetic {
        let (width, height) = parse_size(size)?;
        settings.source = SourceSelector::Synthetic {
            width,
            height,
            frames: cli.frames,
        };
    }
    if let Some(path) = &cli.model {
        settings.model_path = Some(path.clone());
    }
    if let Some(v) = cli.min_size {
        settings.detector.min_size_fraction = v;
    }
    if let Some(v) = cli.scale_factor {
        settings.detector.scale_factor = v;
    }
    if let Some(v) = cli.min_neighbors {
        settings.detector.min_neighbors = v;
    }
    if let Some(v) = cli.skip_frames {
        settings.skip_frames = v;
    }
    if let Some(v) = cli.downscale {
        settings.downscale = v;
    }
    if cli.threaded {
        settings.threaded = true;
    }

    settings.validate()?;
    Ok(settings)
}

fn parse_size(text: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Size must look like 640x480, got '{text}'"))?;
    let width: u32 = w.trim().parse()?;
    let height: u32 = h.trim().parse()?;
    if width == 0 || height == 0 {
        return Err(format!("Size must be positive, got '{text}'").into());
    }
    Ok((width, height))
}

/// `assets/` next to the executable, where release bundles ship the model.
fn default_bundled_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
}
