/// One rung of the scale ladder: a window size and the sliding step used at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rung {
    pub width: u32,
    pub height: u32,
    pub step: u32,
}

/// Geometric sequence of window sizes scanned over one frame size.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleLadder {
    rungs: Vec<Rung>,
}

impl ScaleLadder {
    /// Builds the ladder from `min_size` (the window's smaller side) up to the
    /// frame's minor dimension.
    ///
    /// Window sides are `round(base * scale)`; a rung whose rounded size
    /// repeats the previous one is skipped. The ladder is empty when the
    /// minimum window does not fit the frame.
    pub fn build(
        frame_w: u32,
        frame_h: u32,
        min_size: u32,
        base_w: u32,
        base_h: u32,
        scale_factor: f64,
        step_fraction: f64,
    ) -> Self {
        let minor = frame_w.min(frame_h);
        let base_min = base_w.min(base_h);
        let mut rungs = Vec::new();
        if min_size > minor || base_min == 0 {
            return Self { rungs };
        }

        let mut scale = min_size as f64 / base_min as f64;
        let mut last: Option<(u32, u32)> = None;
        loop {
            let width = (base_w as f64 * scale).round() as u32;
            let height = (base_h as f64 * scale).round() as u32;
            if width > frame_w || height > frame_h || width.max(height) > minor {
                break;
            }
            if last != Some((width, height)) {
                last = Some((width, height));
                let step = ((width.min(height) as f64 * step_fraction).round() as u32).max(1);
                rungs.push(Rung {
                    width,
                    height,
                    step,
                });
            }
            scale *= scale_factor;
        }

        Self { rungs }
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }
}

/// Minimum window side for a frame: a fraction of the shorter frame side,
/// never smaller than the model's base window.
pub fn min_window_size(frame_w: u32, frame_h: u32, fraction: f64, base_w: u32, base_h: u32) -> u32 {
    let minor = frame_w.min(frame_h) as f64;
    ((minor * fraction).round() as u32).max(base_w.min(base_h))
}
