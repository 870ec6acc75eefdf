pub mod cascade_detector;
pub mod cascade_loader;
pub mod downscale_detector;
pub mod opencv_cascade_loader;
pub mod skip_frame_detector;
