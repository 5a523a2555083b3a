use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::enums::GuiderPhase;

#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct GuiderState {
    // Camera and lens are connected or not.
    pub is_connected: bool,
    // Calibration file exists or not.
    pub is_calibrated: bool,
    // Guiding worker is running or not.
    pub is_guiding: bool,
    // Exposure time in second.
    pub exposure_time: f64,
    // Minimum time between two correction cycles in second.
    pub guiding_interval: f64,
    // Binning.
    pub binning: i32,
    // Reference image of the guiding session.
    pub reference_image: Option<PathBuf>,
}

impl GuiderState {
    /// Create a new state with the default parameters.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    ///
    /// # Returns
    /// A new state.
    pub fn new(config: &Config) -> Self {
        Self {
            is_connected: false,
            is_calibrated: false,
            is_guiding: false,
            exposure_time: config.exposure_time,
            guiding_interval: config.guiding_interval,
            binning: config.binning,
            reference_image: None,
        }
    }

    /// Get the phase.
    ///
    /// # Returns
    /// Phase of the guider.
    pub fn phase(&self) -> GuiderPhase {
        if !self.is_connected {
            GuiderPhase::Disconnected
        } else if self.is_guiding {
            GuiderPhase::Guiding
        } else {
            GuiderPhase::Idle
        }
    }
}
