use std::path::{Path, PathBuf};

use crate::capture::domain::access_gate::AccessGate;
use crate::capture::domain::frame_source::{FrameSource, SourceError, SourceInfo};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays the image files of a directory as a camera stream, in file-name
/// order. Files are decoded lazily, one per `next_frame` call.
pub struct ImageSequenceSource {
    dir: PathBuf,
    gate: AccessGate,
    files: Vec<PathBuf>,
    cursor: usize,
    open: bool,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>, gate: AccessGate) -> Self {
        Self {
            dir: dir.into(),
            gate,
            files: Vec::new(),
            cursor: 0,
            open: false,
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let read_err = |e| SourceError::Read {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn decode(path: &Path, index: usize) -> Result<Frame, SourceError> {
    let img = image::open(path).map_err(|e| SourceError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), w, h, 3, index))
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<SourceInfo, SourceError> {
        if !self.gate.is_granted() {
            return Err(SourceError::NotAuthorized);
        }
        let files = list_images(&self.dir)?;
        let first = files.first().ok_or_else(|| {
            SourceError::Unavailable(format!("no images in {}", self.dir.display()))
        })?;
        let (width, height) =
            image::image_dimensions(first).map_err(|e| SourceError::Decode {
                path: first.clone(),
                reason: e.to_string(),
            })?;

        log::info!(
            "Opened image sequence {} ({} frames, {width}x{height})",
            self.dir.display(),
            files.len()
        );
        let info = SourceInfo {
            width,
            height,
            total_frames: Some(files.len()),
            label: self.dir.display().to_string(),
        };
        self.files = files;
        self.cursor = 0;
        self.open = true;
        Ok(info)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        if !self.gate.is_granted() {
            return Err(SourceError::NotAuthorized);
        }
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        let frame = decode(path, self.cursor)?;
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.open = false;
        self.files.clear();
    }
}
