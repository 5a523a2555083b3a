pub mod calibration;
pub mod calibration_solver;
pub mod guider;
pub mod guiding_core;
pub mod guiding_process;
pub mod imaging;
pub mod math_tool;
