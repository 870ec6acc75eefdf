use crate::capture::domain::frame_source::SourceError;
use crate::shared::frame::Frame;

/// Downstream renderer for annotated frames.
pub trait FrameSink: Send {
    fn present(&mut self, frame: &Frame) -> Result<(), SourceError>;

    /// Flushes anything buffered. Called once when a run ends.
    fn close(&mut self) {}
}
