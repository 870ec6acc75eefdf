use std::time::Instant;

use crate::annotation::domain::frame_annotator::{BoxStyle, FrameAnnotator};
use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::SourceError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::frame::Frame;

/// Outcome of one detection cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub index: usize,
    pub detections: usize,
    /// True when no detector was installed and the frame went out untouched.
    pub passthrough: bool,
}

/// One detection cycle: detect, annotate, deliver.
///
/// Without a detector the processor forwards frames unannotated, which is
/// how the pipeline keeps running after a failed model load.
pub struct FrameProcessor {
    detector: Option<Box<dyn FaceDetector>>,
    annotator: Box<dyn FrameAnnotator>,
    sink: Box<dyn FrameSink>,
    style: BoxStyle,
    logger: Box<dyn PipelineLogger>,
    expected_frames: Option<usize>,
    processed: usize,
}

impl FrameProcessor {
    pub fn new(
        annotator: Box<dyn FrameAnnotator>,
        sink: Box<dyn FrameSink>,
        style: BoxStyle,
    ) -> Self {
        Self {
            detector: None,
            annotator,
            sink,
            style,
            logger: Box::new(NullPipelineLogger),
            expected_frames: None,
            processed: 0,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn set_logger(&mut self, logger: Box<dyn PipelineLogger>) {
        self.logger = logger;
    }

    pub fn set_detector(&mut self, detector: Option<Box<dyn FaceDetector>>) {
        self.detector = detector;
    }

    pub fn is_passthrough(&self) -> bool {
        self.detector.is_none()
    }

    pub fn style(&self) -> &BoxStyle {
        &self.style
    }

    /// Resets progress for a new run of `expected` frames (`None` for live).
    pub fn begin(&mut self, expected: Option<usize>) {
        self.expected_frames = expected;
        self.processed = 0;
    }

    pub fn process(&mut self, mut frame: Frame) -> Result<CycleReport, SourceError> {
        let index = frame.index();
        let mut detections = 0;

        if let Some(detector) = self.detector.as_mut() {
            let t0 = Instant::now();
            let found = detector.detect(&frame);
            self.logger
                .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
            self.logger.metric("detections", found.len() as f64);
            detections = found.len();

            let t0 = Instant::now();
            self.annotator.annotate(&mut frame, &found, &self.style);
            self.logger
                .timing("annotate", t0.elapsed().as_secs_f64() * 1000.0);
        }

        let t0 = Instant::now();
        self.sink.present(&frame)?;
        self.logger
            .timing("deliver", t0.elapsed().as_secs_f64() * 1000.0);

        self.processed += 1;
        self.logger.progress(self.processed, self.expected_frames);
        log::debug!("Frame {index}: {detections} detections");

        Ok(CycleReport {
            index,
            detections,
            passthrough: self.detector.is_none(),
        })
    }

    pub fn record_dropped(&mut self, dropped: usize) {
        self.logger.metric("dropped_frames", dropped as f64);
    }

    /// Flushes the sink and emits the logger summary at the end of a run.
    pub fn finish(&mut self) {
        self.sink.close();
        self.logger.summary();
    }
}
