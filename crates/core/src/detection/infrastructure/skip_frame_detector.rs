use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::settings::ConfigError;

/// Decorator that runs detection every N frames, reusing results in between.
///
/// Boxes on skipped frames are the last real detection repeated unchanged,
/// trading a little positional lag for a lower detection rate.
pub struct SkipFrameDetector {
    inner: Box<dyn FaceDetector>,
    skip_interval: usize,
    frame_count: usize,
    last: DetectionSet,
}

impl SkipFrameDetector {
    pub fn new(inner: Box<dyn FaceDetector>, skip_interval: usize) -> Result<Self, ConfigError> {
        if skip_interval < 1 {
            return Err(ConfigError::invalid("skip_frames", "must be at least 1"));
        }
        Ok(Self {
            inner,
            skip_interval,
            frame_count: 0,
            last: Vec::new(),
        })
    }
}

impl FaceDetector for SkipFrameDetector {
    fn detect(&mut self, frame: &Frame) -> DetectionSet {
        if self.frame_count % self.skip_interval == 0 {
            self.last = self.inner.detect(frame);
        }
        self.frame_count += 1;
        self.last.clone()
    }
}
