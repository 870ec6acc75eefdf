use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::settings::ConfigError;

/// Decorator that detects on a reduced-size copy of the gray plane and maps
/// the boxes back to full resolution.
///
/// Each output pixel is the mean of a `factor x factor` block; trailing rows
/// and columns that do not fill a block are dropped.
pub struct DownscaleDetector {
    inner: Box<dyn FaceDetector>,
    factor: u32,
}

impl DownscaleDetector {
    pub fn new(inner: Box<dyn FaceDetector>, factor: u32) -> Result<Self, ConfigError> {
        if factor < 1 {
            return Err(ConfigError::invalid("downscale", "must be at least 1"));
        }
        Ok(Self { inner, factor })
    }
}

/// Box-average downscale of a single-channel plane by an integer factor.
fn downscale(gray: &[u8], width: usize, height: usize, factor: usize) -> (Vec<u8>, usize, usize) {
    let new_w = width / factor;
    let new_h = height / factor;
    let area = (factor * factor) as u32;
    let mut out = vec![0u8; new_w * new_h];

    for y in 0..new_h {
        for x in 0..new_w {
            let mut sum = 0u32;
            for dy in 0..factor {
                let row = (y * factor + dy) * width + x * factor;
                sum += gray[row..row + factor].iter().map(|&v| v as u32).sum::<u32>();
            }
            out[y * new_w + x] = ((sum + area / 2) / area) as u8;
        }
    }

    (out, new_w, new_h)
}

impl FaceDetector for DownscaleDetector {
    fn detect(&mut self, frame: &Frame) -> DetectionSet {
        if self.factor == 1 {
            return self.inner.detect(frame);
        }
        let f = self.factor as usize;
        let (small, w, h) = downscale(
            frame.gray(),
            frame.width() as usize,
            frame.height() as usize,
            f,
        );
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let reduced = Frame::from_gray(small, w as u32, h as u32, frame.index());
        self.inner
            .detect(&reduced)
            .into_iter()
            .map(|mut d| {
                d.region = d.region.scaled(self.factor);
                d
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::detection::domain::detection::Detection;
    use crate::detection::infrastructure::cascade_detector::CascadeDetector;
    use crate::shared::region::Region;
    use crate::shared::settings::DetectorConfig;
    use crate::test_support::{ring_frame, ring_model};

    /// Records the size of the frames it sees and reports one fixed box.
    struct SizeRecorder {
        seen: Arc<std::sync::Mutex<Vec<(u32, u32)>>>,
    }

    impl FaceDetector for SizeRecorder {
        fn detect(&mut self, frame: &Frame) -> DetectionSet {
            self.seen.lock().unwrap().push((frame.width(), frame.height()));
            vec![Detection {
                region: Region::new(1, 2, 3, 4),
                neighbors: 2,
            }]
        }
    }

    #[test]
    fn test_downscale_averages_blocks() {
        let gray = vec![0, 10, 20, 30, 100, 110, 120, 130, 0];
        // 3x3 by 2: one output pixel from the top-left 2x2 block
        let (out, w, h) = downscale(&gray, 3, 3, 2);
        assert_eq!((w, h), (1, 1));
        assert_eq!(out, vec![35]); // round(140 / 4)
    }

    #[test]
    fn test_boxes_scaled_back_to_full_resolution() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = SizeRecorder {
            seen: Arc::clone(&seen),
        };
        let mut detector = DownscaleDetector::new(Box::new(recorder), 2).unwrap();
        let result = detector.detect(&ring_frame(100, 81, None, 0));

        assert_eq!(seen.lock().unwrap()[0], (50, 40));
        assert_eq!(result[0].region, Region::new(2, 4, 6, 8));
    }

    #[test]
    fn test_factor_zero_errors() {
        let recorder = SizeRecorder {
            seen: Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        let result = DownscaleDetector::new(Box::new(recorder), 0);
        assert!(matches!(result, Err(ConfigError::Invalid { field: "downscale", .. })));
    }

    #[test]
    fn test_target_found_at_half_resolution() {
        let cascade =
            CascadeDetector::new(Arc::new(ring_model()), DetectorConfig::default()).unwrap();
        let mut detector = DownscaleDetector::new(Box::new(cascade), 2).unwrap();
        let result = detector.detect(&ring_frame(320, 240, Some((80, 60, 96)), 0));

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].region, Region::new(82, 62, 88, 88));
    }
}
