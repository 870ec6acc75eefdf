use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::domain::frame_source::{FrameSource, SourceError};
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::pipeline_executor::{PipelineExecutor, RunEnd, RunStats};

/// Pulls and processes frames on the caller's thread.
///
/// Capture waits for the previous cycle to finish, so no frame is ever
/// dropped; a slow detector slows the source down instead.
#[derive(Default)]
pub struct SequentialPipelineExecutor;

impl SequentialPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for SequentialPipelineExecutor {
    fn execute(
        &self,
        source: &mut dyn FrameSource,
        processor: &mut FrameProcessor,
        cancelled: &AtomicBool,
    ) -> Result<RunStats, SourceError> {
        let mut delivered = 0;
        loop {
            if cancelled.load(Ordering::Relaxed) {
                return Ok(RunStats {
                    delivered,
                    dropped: 0,
                    end: RunEnd::Stopped,
                });
            }
            let Some(frame) = source.next_frame()? else {
                return Ok(RunStats {
                    delivered,
                    dropped: 0,
                    end: RunEnd::EndOfStream,
                });
            };
            processor.process(frame)?;
            delivered += 1;
        }
    }
}
