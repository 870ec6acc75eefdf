use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::SourceError;
use crate::shared::frame::Frame;

/// Discards frames, counting them.
#[derive(Default)]
pub struct NullFrameSink {
    presented: usize,
}

impl NullFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> usize {
        self.presented
    }
}

impl FrameSink for NullFrameSink {
    fn present(&mut self, _frame: &Frame) -> Result<(), SourceError> {
        self.presented += 1;
        Ok(())
    }
}
