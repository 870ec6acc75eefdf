use crate::shared::region::Region;

/// A candidate sub-window evaluated against the cascade at one scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DetectionWindow {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn to_region(&self) -> Region {
        Region::new(
            self.x as i32,
            self.y as i32,
            self.width as i32,
            self.height as i32,
        )
    }
}

/// A merged detection. `neighbors` counts the raw windows that voted for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    pub region: Region,
    pub neighbors: usize,
}

/// All detections for one frame. Order carries no meaning.
pub type DetectionSet = Vec<Detection>;
