use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::annotation::infrastructure::rectangle_annotator::RectangleAnnotator;
use crate::capture::domain::access_gate::AccessGate;
use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::{FrameSource, SourceError};
use crate::capture::infrastructure::source_factory::create_source;
use crate::detection::domain::cascade_model::CascadeModel;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::cascade_detector::CascadeDetector;
use crate::detection::infrastructure::cascade_loader::{self, LoadError};
use crate::detection::infrastructure::downscale_detector::DownscaleDetector;
use crate::detection::infrastructure::skip_frame_detector::SkipFrameDetector;
use crate::pipeline::frame_processor::{CycleReport, FrameProcessor};
use crate::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use crate::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use crate::pipeline::pipeline_executor::{PipelineExecutor, RunStats};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::settings::{ConfigError, DetectorConfig, PipelineSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Faulted,
}

/// Requests a cooperative stop from another thread. The cycle in flight
/// finishes first.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Owns the capture source, the detection cycle and the executor, and moves
/// the pipeline between `Idle`, `Running` and `Faulted`.
///
/// A controller starts without a detector. Until a model loads, frames are
/// delivered unannotated.
pub struct PipelineController {
    source: Box<dyn FrameSource>,
    processor: FrameProcessor,
    executor: Box<dyn PipelineExecutor>,
    config: DetectorConfig,
    skip_frames: usize,
    downscale: u32,
    state: PipelineState,
    cancelled: Arc<AtomicBool>,
}

impl PipelineController {
    pub fn new(
        source: Box<dyn FrameSource>,
        processor: FrameProcessor,
        executor: Box<dyn PipelineExecutor>,
    ) -> Self {
        Self {
            source,
            processor,
            executor,
            config: DetectorConfig::default(),
            skip_frames: 1,
            downscale: 1,
            state: PipelineState::Idle,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Detector tuning applied by the next model load.
    pub fn with_detector_config(
        mut self,
        config: DetectorConfig,
        skip_frames: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if skip_frames < 1 {
            return Err(ConfigError::invalid("skip_frames", "must be at least 1"));
        }
        self.config = config;
        self.skip_frames = skip_frames;
        Ok(self)
    }

    /// Detect on frames shrunk by `factor`, applied by the next model load.
    pub fn with_downscale(mut self, factor: u32) -> Result<Self, ConfigError> {
        if factor < 1 {
            return Err(ConfigError::invalid("downscale", "must be at least 1"));
        }
        self.downscale = factor;
        Ok(self)
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.processor.set_logger(logger);
        self
    }

    /// Wires a controller from host settings: source from the selector,
    /// rectangle annotation in the configured style, threaded or
    /// sequential execution.
    pub fn from_settings(
        settings: &PipelineSettings,
        gate: AccessGate,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let source = create_source(&settings.source, gate);
        let processor =
            FrameProcessor::new(Box::new(RectangleAnnotator::new()), sink, settings.style);
        let executor: Box<dyn PipelineExecutor> = if settings.threaded {
            Box::new(ThreadedPipelineExecutor::new())
        } else {
            Box::new(SequentialPipelineExecutor::new())
        };
        Self::new(source, processor, executor)
            .with_detector_config(settings.detector.clone(), settings.skip_frames)?
            .with_downscale(settings.downscale)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_passthrough(&self) -> bool {
        self.processor.is_passthrough()
    }

    pub fn load_model(&mut self, path: &Path) -> Result<(), LoadError> {
        self.install_model(cascade_loader::load(path))
    }

    pub fn load_model_bytes(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        self.install_model(cascade_loader::load_from_bytes(bytes))
    }

    fn install_model(&mut self, loaded: Result<CascadeModel, LoadError>) -> Result<(), LoadError> {
        let model = match loaded {
            Ok(model) => model,
            Err(e) => {
                self.processor.set_detector(None);
                log::warn!("Cascade model unavailable, frames pass through unannotated: {e}");
                return Err(e);
            }
        };

        let detector = match self.build_detector(model) {
            Ok(detector) => detector,
            Err(e) => {
                self.processor.set_detector(None);
                log::error!("Cannot build detector, frames pass through unannotated: {e}");
                return Err(LoadError::Detector(e));
            }
        };
        self.processor.set_detector(Some(detector));
        if self.state == PipelineState::Faulted {
            self.state = PipelineState::Idle;
        }
        Ok(())
    }

    fn build_detector(&self, model: CascadeModel) -> Result<Box<dyn FaceDetector>, ConfigError> {
        let mut detector: Box<dyn FaceDetector> =
            Box::new(CascadeDetector::new(Arc::new(model), self.config.clone())?);
        if self.downscale > 1 {
            detector = Box::new(DownscaleDetector::new(detector, self.downscale)?);
        }
        if self.skip_frames > 1 {
            detector = Box::new(SkipFrameDetector::new(detector, self.skip_frames)?);
        }
        Ok(detector)
    }

    /// Opens the source. A no-op while already running.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.state == PipelineState::Running {
            return Ok(());
        }
        self.cancelled.store(false, Ordering::SeqCst);
        match self.source.open() {
            Ok(info) => {
                log::info!(
                    "Capture started: {} ({}x{})",
                    info.label,
                    info.width,
                    info.height
                );
                self.processor.begin(info.total_frames);
                self.state = PipelineState::Running;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to open frame source: {e}");
                self.state = PipelineState::Faulted;
                Err(e)
            }
        }
    }

    /// Runs one detection cycle. Returns `None` at end of stream, after
    /// which the pipeline is idle again.
    pub fn step(&mut self) -> Result<Option<CycleReport>, SourceError> {
        if self.state != PipelineState::Running {
            return Err(SourceError::NotOpen);
        }
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.shut_down(PipelineState::Idle);
                return Ok(None);
            }
            Err(e) => return Err(self.fault(e)),
        };
        match self.processor.process(frame) {
            Ok(report) => Ok(Some(report)),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Drives cycles with the configured executor until end of stream, a
    /// stop request or an error. Starts the pipeline first if needed.
    pub fn run(&mut self) -> Result<RunStats, SourceError> {
        self.start()?;
        let result = self
            .executor
            .execute(self.source.as_mut(), &mut self.processor, &self.cancelled);
        match result {
            Ok(stats) => {
                log::info!(
                    "Run ended ({:?}): {} delivered, {} dropped",
                    stats.end,
                    stats.delivered,
                    stats.dropped
                );
                self.shut_down(PipelineState::Idle);
                Ok(stats)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.cancelled))
    }

    pub fn stop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if self.state == PipelineState::Running {
            self.shut_down(PipelineState::Idle);
            log::info!("Pipeline stopped");
        }
    }

    /// Replaces the capture source, restarting on the new one if the
    /// pipeline was running.
    pub fn switch_source(&mut self, source: Box<dyn FrameSource>) -> Result<(), SourceError> {
        let was_running = self.state == PipelineState::Running;
        self.stop();
        self.source = source;
        log::info!("Switched frame source");
        if was_running {
            self.start()
        } else {
            Ok(())
        }
    }

    pub fn teardown(mut self) {
        self.stop();
        self.processor.set_detector(None);
        log::info!("Pipeline torn down");
    }

    fn shut_down(&mut self, next: PipelineState) {
        self.source.close();
        self.processor.finish();
        self.state = next;
    }

    fn fault(&mut self, e: SourceError) -> SourceError {
        log::error!("Pipeline faulted: {e}");
        self.shut_down(PipelineState::Faulted);
        e
    }
}
