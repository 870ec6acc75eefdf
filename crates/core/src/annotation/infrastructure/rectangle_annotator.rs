use crate::annotation::domain::frame_annotator::{BoxStyle, FrameAnnotator};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// CPU outline renderer.
///
/// The stroke grows inward from the box edge, so a box touching the frame
/// border stays fully visible. Boxes are clipped to the frame first.
#[derive(Default)]
pub struct RectangleAnnotator;

impl RectangleAnnotator {
    pub fn new() -> Self {
        Self
    }
}

impl FrameAnnotator for RectangleAnnotator {
    fn draw_rectangle(&self, frame: &mut Frame, region: &Region, style: &BoxStyle) {
        let Some(r) = region.clamp_to(frame.width(), frame.height()) else {
            return;
        };
        let fw = frame.width() as usize;
        let channels = frame.channels() as usize;
        let pixel = pixel_value(&style.color, channels);
        let data = frame.data_mut();

        let (x0, y0) = (r.x as usize, r.y as usize);
        let (x1, y1) = (r.right() as usize, r.bottom() as usize);
        let stroke = (style.stroke_width.max(1) as usize)
            .min(r.width as usize)
            .min(r.height as usize);

        let mut fill = |xa: usize, xb: usize, ya: usize, yb: usize| {
            for y in ya..yb {
                let row = (y * fw + xa) * channels;
                for px in data[row..row + (xb - xa) * channels].chunks_exact_mut(channels) {
                    px.copy_from_slice(&pixel[..channels]);
                }
            }
        };

        // top and bottom bands span the full width, side bands fill between them
        fill(x0, x1, y0, y0 + stroke);
        fill(x0, x1, y1 - stroke, y1);
        fill(x0, x0 + stroke, y0 + stroke, y1 - stroke);
        fill(x1 - stroke, x1, y0 + stroke, y1 - stroke);
    }
}

fn pixel_value(color: &[u8; 4], channels: usize) -> [u8; 4] {
    match channels {
        1 | 2 => {
            let y = 299 * color[0] as u32 + 587 * color[1] as u32 + 114 * color[2] as u32;
            let l = ((y + 500) / 1000) as u8;
            [l, color[3], 0, 0]
        }
        _ => *color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Detection;
    use rstest::rstest;

    fn make_frame(width: u32, height: u32, channels: u8, value: u8) -> Frame {
        let data = vec![value; (width * height * channels as u32) as usize];
        Frame::new(data, width, height, channels, 0)
    }

    fn px(frame: &Frame, x: usize, y: usize) -> &[u8] {
        let c = frame.channels() as usize;
        let i = (y * frame.width() as usize + x) * c;
        &frame.data()[i..i + c]
    }

    fn detection(x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection {
            region: Region::new(x, y, w, h),
            neighbors: 3,
        }
    }

    #[test]
    fn test_empty_set_leaves_frame_identical() {
        let mut frame = make_frame(40, 30, 3, 77);
        let before = frame.data().to_vec();
        RectangleAnnotator::new().annotate(&mut frame, &[], &BoxStyle::default());
        assert_eq!(frame.data(), &before[..]);
    }

    #[test]
    fn test_outline_drawn_interior_untouched() {
        let mut frame = make_frame(50, 50, 3, 0);
        let style = BoxStyle::default();
        RectangleAnnotator::new().annotate(&mut frame, &[detection(10, 10, 20, 20)], &style);

        assert_eq!(px(&frame, 10, 10), &[0, 255, 0]);
        assert_eq!(px(&frame, 11, 20), &[0, 255, 0]);
        assert_eq!(px(&frame, 29, 29), &[0, 255, 0]);
        assert_eq!(px(&frame, 20, 20), &[0, 0, 0]);
        assert_eq!(px(&frame, 12, 12), &[0, 0, 0]);
        assert_eq!(px(&frame, 30, 30), &[0, 0, 0]);
        assert_eq!(px(&frame, 9, 9), &[0, 0, 0]);
    }

    #[test]
    fn test_gray_plane_untouched() {
        let mut frame = make_frame(20, 20, 3, 50);
        let gray = frame.gray().to_vec();
        RectangleAnnotator::new().annotate(&mut frame, &[detection(2, 2, 10, 10)], &BoxStyle::default());
        assert_eq!(frame.gray(), &gray[..]);
    }

    #[test]
    fn test_drawing_twice_is_idempotent() {
        let annotator = RectangleAnnotator::new();
        let style = BoxStyle::default();
        let boxes = [detection(5, 5, 20, 10)];

        let mut once = make_frame(40, 40, 3, 9);
        annotator.annotate(&mut once, &boxes, &style);
        let mut twice = once.clone();
        annotator.annotate(&mut twice, &boxes, &style);

        assert_eq!(once.data(), twice.data());
    }

    #[rstest]
    #[case::overhangs_left_top(-10, -10, 30, 30)]
    #[case::overhangs_right_bottom(30, 30, 40, 40)]
    #[case::covers_frame(-5, -5, 100, 100)]
    fn test_boxes_past_the_edge_are_clamped(
        #[case] x: i32,
        #[case] y: i32,
        #[case] w: i32,
        #[case] h: i32,
    ) {
        let mut frame = make_frame(40, 40, 3, 0);
        RectangleAnnotator::new().annotate(&mut frame, &[detection(x, y, w, h)], &BoxStyle::default());
        assert!(frame.data().iter().any(|&v| v == 255));
    }

    #[test]
    fn test_box_fully_outside_is_ignored() {
        let mut frame = make_frame(20, 20, 3, 0);
        RectangleAnnotator::new().annotate(&mut frame, &[detection(50, 50, 10, 10)], &BoxStyle::default());
        assert!(frame.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_stroke_wider_than_box_fills_it() {
        let mut frame = make_frame(10, 10, 3, 0);
        let style = BoxStyle {
            color: [255, 0, 0, 255],
            stroke_width: 8,
        };
        RectangleAnnotator::new().draw_rectangle(&mut frame, &Region::new(2, 2, 3, 3), &style);
        for y in 2..5 {
            for x in 2..5 {
                assert_eq!(px(&frame, x, y), &[255, 0, 0]);
            }
        }
        assert_eq!(px(&frame, 5, 5), &[0, 0, 0]);
    }

    #[test]
    fn test_rgba_frame_receives_alpha() {
        let mut frame = make_frame(10, 10, 4, 0);
        let style = BoxStyle {
            color: [1, 2, 3, 200],
            stroke_width: 1,
        };
        RectangleAnnotator::new().draw_rectangle(&mut frame, &Region::new(0, 0, 5, 5), &style);
        assert_eq!(px(&frame, 0, 0), &[1, 2, 3, 200]);
    }

    #[test]
    fn test_single_channel_frame_receives_luma() {
        let mut frame = make_frame(10, 10, 1, 0);
        RectangleAnnotator::new().draw_rectangle(&mut frame, &Region::new(0, 0, 5, 5), &BoxStyle::default());
        // luma of pure green
        assert_eq!(px(&frame, 0, 0), &[150]);
    }
}
