// Limit of the image stabilization unit position in digital units.
pub const LENS_POSITION_LIMIT: i32 = 4096;

// Simulated camera writes the exposures to this directory of the image store.
pub const CAMERA_OUTPUT_DIR: &str = "/tmp/ao_guider_simulation";

// Fraction of the peak above the minimum that a pixel needs to count in the
// centroid.
pub const CENTROID_THRESHOLD: f32 = 0.2;

// Minimum contrast of a frame to find a star.
pub const MIN_STAR_CONTRAST: f32 = 1.0;

// Number of the frames kept by the in-memory image store.
pub const MAX_STORED_FRAMES: usize = 64;
