use serde::{Deserialize, Serialize};

use crate::detection::domain::detection::Detection;
use crate::shared::constants::{DEFAULT_BOX_COLOR, DEFAULT_STROKE_WIDTH};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Outline appearance for detection boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxStyle {
    /// RGBA. Frames without alpha ignore the last component; single-channel
    /// frames receive the color's luma.
    pub color: [u8; 4],
    pub stroke_width: u32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_BOX_COLOR,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Domain interface for drawing detections onto a frame's color plane.
///
/// Implementations modify the frame in place and never touch the gray plane.
/// Drawing the same box twice yields the same pixels as drawing it once.
pub trait FrameAnnotator: Send {
    fn draw_rectangle(&self, frame: &mut Frame, region: &Region, style: &BoxStyle);

    fn annotate(&self, frame: &mut Frame, detections: &[Detection], style: &BoxStyle) {
        for d in detections {
            self.draw_rectangle(frame, &d.region, style);
        }
    }
}
