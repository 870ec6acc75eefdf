pub mod cascade_model;
pub mod detection;
pub mod face_detector;
pub mod integral_image;
pub mod scale_ladder;
pub mod window_grouper;
