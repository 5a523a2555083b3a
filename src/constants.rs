use std::time::Duration;

// Home position of the image stabilization unit in digital units.
pub const HOME_POSITION: (i32, i32) = (0, 0);

// Names of the calibration exposures in the diagnostic directory.
pub const CALIBRATION_BASELINE_IMAGE: &str = "is_calibration_run_position_1.json";
pub const CALIBRATION_SHIFTED_IMAGE: &str = "is_calibration_run_position_2.json";

// Names of the difference images in the diagnostic directory. The "before"
// image compares the new exposure with the reference image, and the "after"
// image compares the verification exposure with the reference image.
pub const DIFFERENCE_IMAGE_BEFORE: &str = "before.json";
pub const DIFFERENCE_IMAGE_AFTER: &str = "after.json";

// Minimum number of rows of a raw frame that can be trimmed.
pub const MIN_FRAME_ROWS: usize = 4;

// Keys of the calibration file.
pub const CALIBRATION_KEYS: [&str; 8] = ["A11", "A12", "A21", "A22", "B11", "B12", "B21", "B22"];

// Bound of the synchronous channel.
pub const BOUND_SYNC_CHANNEL: usize = 1;

// Simulation parameters file.
pub const SIMULATION_CONFIG_FILE: &str = "config/parameters_simulation.yaml";

// Period to check the stop request of the application.
pub const PERIOD_CHECK_STOP: Duration = Duration::from_millis(100);
