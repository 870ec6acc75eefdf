use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

/// Describes an opened capture stream.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// `None` for live streams with no known end.
    pub total_frames: Option<usize>,
    pub label: String,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("camera access has not been granted")]
    NotAuthorized,

    #[error("source is not open")]
    NotOpen,

    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("frame delivery failed: {0}")]
    Delivery(String),

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

/// A device that delivers a continuous sequence of frames.
///
/// Frames carry strictly increasing indices starting at zero for each
/// `open`. Implementations are driven from one thread at a time but may be
/// moved to a capture thread, hence `Send`.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, SourceError>;

    /// Returns the next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Releases the device. Closing a closed source does nothing.
    fn close(&mut self);
}
