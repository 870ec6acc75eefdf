use crate::capture::domain::access_gate::AccessGate;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::settings::SourceSelector;

use super::image_sequence_source::ImageSequenceSource;
use super::synthetic_source::SyntheticSource;

/// Creates the capture device named by the selector. Logs which one is used.
pub fn create_source(selector: &SourceSelector, gate: AccessGate) -> Box<dyn FrameSource> {
    match selector {
        SourceSelector::Directory { path } => {
            log::info!("Using image sequence source at {}", path.display());
            Box::new(ImageSequenceSource::new(path.clone(), gate))
        }
        SourceSelector::Synthetic {
            width,
            height,
            frames,
        } => {
            log::info!("Using synthetic source ({width}x{height}, {frames} frames)");
            Box::new(SyntheticSource::new(*width, *height, *frames, gate))
        }
    }
}
