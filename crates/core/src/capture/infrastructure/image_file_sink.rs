use std::path::{Path, PathBuf};

use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::SourceError;
use crate::shared::frame::Frame;

/// Writes each presented frame to `<dir>/frame_<index>.png` using the
/// `image` crate.
pub struct ImageFileSink {
    dir: PathBuf,
    written: usize,
}

impl ImageFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }

    fn save(path: &Path, frame: &Frame) -> Result<(), String> {
        let (w, h) = (frame.width(), frame.height());
        let data = frame.data().to_vec();
        let saved = match frame.channels() {
            1 => image::GrayImage::from_raw(w, h, data).map(|img| img.save(path)),
            3 => image::RgbImage::from_raw(w, h, data).map(|img| img.save(path)),
            4 => image::RgbaImage::from_raw(w, h, data).map(|img| img.save(path)),
            c => return Err(format!("unsupported channel count {c}")),
        };
        match saved {
            None => Err("frame data does not match its dimensions".into()),
            Some(result) => result.map_err(|e| e.to_string()),
        }
    }
}

impl FrameSink for ImageFileSink {
    fn present(&mut self, frame: &Frame) -> Result<(), SourceError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| SourceError::Delivery(format!("{}: {e}", self.dir.display())))?;

        let path = self.path_for(frame.index());
        Self::save(&path, frame)
            .map_err(|e| SourceError::Delivery(format!("{}: {e}", path.display())))?;
        self.written += 1;
        log::debug!("Wrote frame {} to {}", frame.index(), path.display());
        Ok(())
    }

    fn close(&mut self) {
        log::info!("Wrote {} frames to {}", self.written, self.dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8, index: usize) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.push(r);
            data.push(g);
            data.push(b);
        }
        Frame::new(data, width, height, 3, index)
    }

    #[test]
    fn test_present_creates_numbered_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path().join("out"));
        sink.present(&make_frame(20, 10, 1, 2, 3, 7)).unwrap();

        let path = sink.path_for(7);
        assert!(path.ends_with("frame_000007.png"));
        assert!(path.exists());
        assert_eq!(sink.written(), 1);
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path());
        sink.present(&make_frame(16, 16, 50, 100, 200, 0)).unwrap();

        let img = image::open(sink.path_for(0)).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (16, 16));
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_gray_frame_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path());
        sink.present(&Frame::from_gray(vec![9; 12], 4, 3, 2)).unwrap();
        let img = image::open(sink.path_for(2)).unwrap().to_luma8();
        assert_eq!(img.get_pixel(3, 2).0, [9]);
    }

    #[test]
    fn test_unwritable_dir_is_delivery_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let mut sink = ImageFileSink::new(blocker.join("sub"));
        let err = sink.present(&make_frame(4, 4, 0, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, SourceError::Delivery(_)));
    }
}
