use crate::detection::domain::detection::DetectionSet;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Implementations may be stateful (cached window sizes, skipped frames),
/// hence `&mut self`. There is no error path: a frame that cannot be
/// scanned yields an empty set.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> DetectionSet;
}
