use std::sync::Arc;

use rayon::prelude::*;

use crate::detection::domain::cascade_model::CascadeModel;
use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::integral_image::IntegralImage;
use crate::detection::domain::scale_ladder::{min_window_size, Rung, ScaleLadder};
use crate::detection::domain::window_grouper::WindowGrouper;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::shared::settings::{ConfigError, DetectorConfig};

/// Scale ladder computed for one frame size.
struct CachedLadder {
    width: u32,
    height: u32,
    min_size: u32,
    ladder: ScaleLadder,
}

/// Multi-scale sliding-window detector driven by a cascade model.
///
/// Every rung of the scale ladder is scanned on the rayon pool; the
/// positive windows are joined in ladder order and handed to the
/// [`WindowGrouper`]. The ladder is computed on the first frame and only
/// recomputed when the frame size changes.
pub struct CascadeDetector {
    model: Arc<CascadeModel>,
    config: DetectorConfig,
    grouper: WindowGrouper,
    cached: Option<CachedLadder>,
}

impl CascadeDetector {
    pub fn new(model: Arc<CascadeModel>, config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grouper = WindowGrouper::new(config.group_overlap, config.min_neighbors);
        Ok(Self {
            model,
            config,
            grouper,
            cached: None,
        })
    }

    pub fn model(&self) -> &CascadeModel {
        &self.model
    }

    /// Minimum window side for the most recent frame size, once one was seen.
    pub fn min_window_size(&self) -> Option<u32> {
        self.cached.as_ref().map(|c| c.min_size)
    }

    fn ladder_for(&mut self, width: u32, height: u32) -> &ScaleLadder {
        if !matches!(&self.cached, Some(c) if c.width == width && c.height == height) {
            self.cached = None;
        }
        let (model, config) = (&self.model, &self.config);
        &self
            .cached
            .get_or_insert_with(|| build_ladder(model, config, width, height))
            .ladder
    }

    /// All raw positive windows for the frame, in ladder then raster order.
    fn candidates(&mut self, frame: &Frame) -> Vec<Region> {
        let (w, h) = (frame.width(), frame.height());
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let model = Arc::clone(&self.model);
        let ladder = self.ladder_for(w, h);
        if ladder.is_empty() {
            return Vec::new();
        }

        let integral = IntegralImage::new(frame.gray_ndarray());
        let per_rung: Vec<Vec<Region>> = ladder
            .rungs()
            .par_iter()
            .map(|rung| scan_rung(&model, &integral, rung))
            .collect();
        per_rung.into_iter().flatten().collect()
    }
}

fn build_ladder(
    model: &CascadeModel,
    config: &DetectorConfig,
    width: u32,
    height: u32,
) -> CachedLadder {
    let (base_w, base_h) = (model.window_width(), model.window_height());
    let min_size = min_window_size(width, height, config.min_size_fraction, base_w, base_h);
    let ladder = ScaleLadder::build(
        width,
        height,
        min_size,
        base_w,
        base_h,
        config.scale_factor,
        config.step_fraction,
    );
    log::debug!(
        "Scale ladder for {width}x{height}: min window {min_size}, {} rungs",
        ladder.len()
    );
    CachedLadder {
        width,
        height,
        min_size,
        ladder,
    }
}

fn scan_rung(model: &CascadeModel, integral: &IntegralImage, rung: &Rung) -> Vec<Region> {
    let scaled = model.at_scale(rung.width, rung.height);
    let mut hits = Vec::new();
    let max_y = integral.height() - rung.height;
    let max_x = integral.width() - rung.width;
    let mut y = 0;
    while y <= max_y {
        let mut x = 0;
        while x <= max_x {
            if scaled.classify(integral, x, y) {
                hits.push(Region::new(
                    x as i32,
                    y as i32,
                    rung.width as i32,
                    rung.height as i32,
                ));
            }
            x += rung.step;
        }
        y += rung.step;
    }
    hits
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, frame: &Frame) -> DetectionSet {
        let candidates = self.candidates(frame);
        let detections = self.grouper.group(&candidates);
        log::debug!(
            "Frame {}: {} raw windows -> {} detections",
            frame.index(),
            candidates.len(),
            detections.len()
        );
        detections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ring_frame, ring_model};

    fn detector(min_size_fraction: f64) -> CascadeDetector {
        let config = DetectorConfig {
            min_size_fraction,
            ..DetectorConfig::default()
        };
        CascadeDetector::new(Arc::new(ring_model()), config).unwrap()
    }

    // ── Scenarios ────────────────────────────────────────────────────

    #[test]
    fn test_solid_frame_has_no_detections() {
        let mut d = detector(0.2);
        let frame = ring_frame(640, 480, None, 0);
        assert!(d.candidates(&frame).is_empty());
        assert!(d.detect(&frame).is_empty());
    }

    #[test]
    fn test_single_target_yields_one_detection() {
        let mut d = detector(0.1);
        let frame = ring_frame(640, 480, Some((100, 100, 80)), 0);
        let result = d.detect(&frame);

        assert_eq!(result.len(), 1);
        let truth = Region::new(100, 100, 80, 80);
        assert!(result[0].region.iou(&truth) >= 0.8);
        assert!(result[0].neighbors >= 2);
    }

    #[test]
    fn test_small_frame_target_located() {
        let mut d = detector(0.2);
        let frame = ring_frame(160, 120, Some((40, 30, 48)), 0);
        let result = d.detect(&frame);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].region, Region::new(41, 31, 44, 44));
        assert_eq!(result[0].neighbors, 3);
    }

    #[test]
    fn test_centred_target_on_quarter_vga() {
        let mut d = detector(0.2);
        let frame = ring_frame(320, 240, Some((112, 72, 96)), 0);
        let result = d.detect(&frame);

        assert_eq!(result.len(), 1);
        assert!(result[0].region.iou(&Region::new(112, 72, 96, 96)) >= 0.8);
    }

    #[test]
    fn test_frame_smaller_than_min_window_is_empty() {
        let mut d = detector(0.2);
        let frame = ring_frame(20, 20, None, 0);
        assert!(d.detect(&frame).is_empty());
    }

    #[test]
    fn test_detect_is_deterministic() {
        let mut d = detector(0.1);
        let frame = ring_frame(640, 480, Some((100, 100, 80)), 0);
        let first = d.detect(&frame);
        for _ in 0..3 {
            assert_eq!(d.detect(&frame), first);
        }
    }

    // ── Window constraints ───────────────────────────────────────────

    #[test]
    fn test_raw_windows_respect_size_bounds() {
        let mut d = detector(0.1);
        let frame = ring_frame(640, 480, Some((100, 100, 80)), 0);
        let candidates = d.candidates(&frame);
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.width.min(c.height) >= 48);
            assert!(c.width.max(c.height) <= 480);
            assert!(c.right() <= 640 && c.bottom() <= 480);
        }
    }

    #[test]
    fn test_min_window_cached_per_frame_size() {
        let mut d = detector(0.2);
        assert_eq!(d.min_window_size(), None);

        d.detect(&ring_frame(640, 480, None, 0));
        assert_eq!(d.min_window_size(), Some(96));

        d.detect(&ring_frame(320, 240, None, 1));
        assert_eq!(d.min_window_size(), Some(48));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectorConfig {
            scale_factor: 1.0,
            ..DetectorConfig::default()
        };
        assert!(CascadeDetector::new(Arc::new(ring_model()), config).is_err());
    }

    #[test]
    fn test_model_shared_across_detectors() {
        let model = Arc::new(ring_model());
        let mut a = CascadeDetector::new(Arc::clone(&model), DetectorConfig::default()).unwrap();
        let mut b = CascadeDetector::new(Arc::clone(&model), DetectorConfig::default()).unwrap();
        let frame = ring_frame(160, 120, Some((40, 30, 48)), 0);
        assert_eq!(a.detect(&frame), b.detect(&frame));
        assert_eq!(Arc::strong_count(&model), 3);
    }
}
