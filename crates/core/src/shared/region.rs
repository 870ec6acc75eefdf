/// An axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn intersection_area(&self, other: &Region) -> i64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());
        (ix2 - ix1).max(0) as i64 * (iy2 - iy1).max(0) as i64
    }

    pub fn iou(&self, other: &Region) -> f64 {
        let inter = self.intersection_area(other);
        if inter == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        inter as f64 / union as f64
    }

    /// True when `self` lies inside `outer` grown by `margin_x`/`margin_y`
    /// on every side.
    pub fn is_inside(&self, outer: &Region, margin_x: i32, margin_y: i32) -> bool {
        self.x >= outer.x - margin_x
            && self.y >= outer.y - margin_y
            && self.right() <= outer.right() + margin_x
            && self.bottom() <= outer.bottom() + margin_y
    }

    /// Clips the region to a `frame_w` x `frame_h` frame. Returns `None`
    /// when nothing visible remains.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(frame_w as i32);
        let y2 = self.bottom().min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Multiplies origin and size by an integer factor.
    pub fn scaled(&self, factor: u32) -> Region {
        let f = factor as i32;
        Region::new(self.x * f, self.y * f, self.width * f, self.height * f)
    }
}
