use crate::capture::domain::access_gate::AccessGate;
use crate::capture::domain::frame_source::{FrameSource, SourceError, SourceInfo};
use crate::shared::frame::Frame;

const BACKGROUND: u8 = 128;
/// Horizontal drift of the target per frame, in pixels.
const DRIFT_PER_FRAME: u32 = 4;

/// Test-pattern camera: a gray field with one ring target drifting left and
/// right across it.
///
/// The target is a bright square with a dark centre covering the middle
/// half of each side. Its side is two fifths of the shorter frame side and
/// it starts centred.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frames: usize,
    gate: AccessGate,
    next_index: usize,
    open: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frames: usize, gate: AccessGate) -> Self {
        Self {
            width,
            height,
            frames,
            gate,
            next_index: 0,
            open: false,
        }
    }

    /// Side of the ring target for this frame size.
    pub fn target_size(&self) -> u32 {
        self.width.min(self.height) * 2 / 5
    }

    /// Top-left corner of the target in frame `index`.
    pub fn target_origin(&self, index: usize) -> (u32, u32) {
        let size = self.target_size();
        let travel = self.width - size;
        let y = (self.height - size) / 2;
        if travel == 0 {
            return (0, y);
        }
        let period = 2 * travel as u64;
        let p = (travel as u64 / 2 + index as u64 * DRIFT_PER_FRAME as u64) % period;
        let x = if p <= travel as u64 { p } else { period - p };
        (x as u32, y)
    }

    fn render(&self, index: usize) -> Frame {
        let (x, y) = self.target_origin(index);
        let gray = ring_target_gray(self.width, self.height, x, y, self.target_size(), BACKGROUND);
        let rgb = gray.iter().flat_map(|&v| [v, v, v]).collect();
        Frame::new(rgb, self.width, self.height, 3, index)
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<SourceInfo, SourceError> {
        if !self.gate.is_granted() {
            return Err(SourceError::NotAuthorized);
        }
        if self.width == 0 || self.height == 0 {
            return Err(SourceError::Unavailable(format!(
                "invalid synthetic frame size {}x{}",
                self.width, self.height
            )));
        }
        self.next_index = 0;
        self.open = true;
        Ok(SourceInfo {
            width: self.width,
            height: self.height,
            total_frames: Some(self.frames),
            label: format!("synthetic {}x{}", self.width, self.height),
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        if !self.gate.is_granted() {
            return Err(SourceError::NotAuthorized);
        }
        if self.next_index >= self.frames {
            return Ok(None);
        }
        let frame = self.render(self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Renders a ring target of side `size` at `(x, y)` onto a flat gray field.
///
/// Pixels of the square's middle half (per axis) are black, the rest of the
/// square is white. Parts falling outside the frame are cut off.
pub fn ring_target_gray(
    frame_w: u32,
    frame_h: u32,
    x: u32,
    y: u32,
    size: u32,
    background: u8,
) -> Vec<u8> {
    let (fw, fh) = (frame_w as usize, frame_h as usize);
    let mut gray = vec![background; fw * fh];
    let q = size / 4;
    for ly in 0..size {
        let py = (y + ly) as usize;
        if py >= fh {
            break;
        }
        for lx in 0..size {
            let px = (x + lx) as usize;
            if px >= fw {
                break;
            }
            let centre = lx >= q && lx < size - q && ly >= q && ly < size - q;
            gray[py * fw + px] = if centre { 0 } else { 255 };
        }
    }
    gray
}
