use std::sync::atomic::AtomicBool;

use crate::capture::domain::frame_source::{FrameSource, SourceError};
use crate::pipeline::frame_processor::FrameProcessor;

/// Why a run stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    EndOfStream,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStats {
    pub delivered: usize,
    /// Frames captured but replaced by a newer one before processing.
    pub dropped: usize,
    pub end: RunEnd,
}

/// Abstracts how the capture → detect → annotate → deliver loop is driven.
///
/// This is a port. Infrastructure provides concrete implementations
/// (sequential, threaded). The source must already be open; `cancelled` is
/// checked between cycles.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        source: &mut dyn FrameSource,
        processor: &mut FrameProcessor,
        cancelled: &AtomicBool,
    ) -> Result<RunStats, SourceError>;
}
