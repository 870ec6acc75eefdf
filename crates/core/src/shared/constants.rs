/// File name the bundled cascade model is installed under.
pub const CASCADE_MODEL_NAME: &str = "ring_target_cascade.json";

/// The only cascade document version this build understands.
pub const CASCADE_FORMAT_VERSION: u32 = 1;

/// Windows flatter than this standard deviation are rejected before any stage runs.
pub const MIN_WINDOW_STD_DEV: f64 = 2.0;

pub const DEFAULT_MIN_SIZE_FRACTION: f64 = 0.2;
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;
pub const DEFAULT_STEP_FRACTION: f64 = 0.1;
pub const DEFAULT_MIN_NEIGHBORS: usize = 2;
pub const DEFAULT_GROUP_OVERLAP: f64 = 0.5;

/// Containment tolerance for nested-window suppression, as a fraction of the outer box.
pub const NESTED_MARGIN_FRACTION: f64 = 0.2;

pub const DEFAULT_BOX_COLOR: [u8; 4] = [0, 255, 0, 255];
pub const DEFAULT_STROKE_WIDTH: u32 = 2;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
