//! Fixtures shared by the unit tests of several modules.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::{FrameSource, SourceError, SourceInfo};
use crate::detection::domain::cascade_model::{
    CascadeModel, Child, Feature, Stage, TreeNode, WeakClassifier, WeightedRect,
};
use crate::shared::constants::CASCADE_MODEL_NAME;
use crate::shared::frame::Frame;

pub(crate) use crate::capture::infrastructure::synthetic_source::ring_target_gray;

/// Centre-surround detector for the synthetic ring target: fires when the
/// centre quarter is much darker than the window as a whole. Same model as
/// the bundled asset.
pub(crate) fn ring_model() -> CascadeModel {
    let feature = Feature {
        rects: vec![
            WeightedRect {
                x: 0,
                y: 0,
                width: 24,
                height: 24,
                weight: -1,
            },
            WeightedRect {
                x: 6,
                y: 6,
                width: 12,
                height: 12,
                weight: 4,
            },
        ],
    };
    let stump = WeakClassifier {
        nodes: vec![TreeNode {
            feature: 0,
            threshold: -1.3,
            left: Child::Leaf(0),
            right: Child::Leaf(1),
        }],
        leaves: vec![1.0, -1.0],
    };
    let stage = Stage {
        threshold: 0.0,
        classifiers: vec![stump],
    };
    CascadeModel::new("ring_target", 24, 24, vec![feature], vec![stage]).unwrap()
}

pub(crate) fn bundled_model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

pub(crate) fn bundled_model_path() -> PathBuf {
    bundled_model_dir().join(CASCADE_MODEL_NAME)
}

/// Three-channel frame whose gray plane is exactly the ring pattern.
pub(crate) fn ring_frame(
    width: u32,
    height: u32,
    target: Option<(u32, u32, u32)>,
    index: usize,
) -> Frame {
    let gray = match target {
        Some((x, y, size)) => ring_target_gray(width, height, x, y, size, 128),
        None => vec![128; (width * height) as usize],
    };
    let rgb = gray.iter().flat_map(|&v| [v, v, v]).collect();
    Frame::new(rgb, width, height, 3, index)
}

/// Keeps a copy of every presented frame. Clones share the record.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    pub(crate) frames: Arc<Mutex<Vec<Frame>>>,
    pub(crate) fail: bool,
}

impl RecordingSink {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl FrameSink for RecordingSink {
    fn present(&mut self, frame: &Frame) -> Result<(), SourceError> {
        if self.fail {
            return Err(SourceError::Delivery("display gone".into()));
        }
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

/// Source yielding `frames` flat 32x24 frames, with optional failure points.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    frames: usize,
    fail_at: Option<usize>,
    panic_at: Option<usize>,
    delay: Option<Duration>,
    fail_open: bool,
    next: usize,
    open: bool,
    pub(crate) opens: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub(crate) fn new(frames: usize) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    pub(crate) fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub(crate) fn panicking_at(mut self, index: usize) -> Self {
        self.panic_at = Some(index);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<SourceInfo, SourceError> {
        if self.fail_open {
            return Err(SourceError::Unavailable("no camera".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.next = 0;
        self.open = true;
        Ok(SourceInfo {
            width: 32,
            height: 24,
            total_frames: Some(self.frames),
            label: "scripted".into(),
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let i = self.next;
        if self.panic_at == Some(i) {
            panic!("capture device crashed");
        }
        if self.fail_at == Some(i) {
            return Err(SourceError::Unavailable("device unplugged".into()));
        }
        if i >= self.frames {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(ring_frame(32, 24, None, i)))
    }

    fn close(&mut self) {
        self.open = false;
    }
}
