// This file is part of run_ao_guider.
//
// Developed for the Dragonfly Telephoto Array active optics system.
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GuiderError;
use crate::utility::{get_parameter, seconds_to_duration};

/// Limits that decide if a registration is trustworthy.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct RegistrationTolerance {
    // Maximum deviation of the scale from 1.0.
    pub max_scale_deviation: f64,
    // Maximum rotation in radian.
    pub max_rotation: f64,
}

/// Limits that decide if the calibration is degenerate.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct CalibrationThreshold {
    // Minimum length of the response of each axis in pixel per digital unit.
    pub min_axis_response: f64,
    // Minimum sine of the angle between the responses of the two axes.
    pub min_axis_sine: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Config {
    // Configuration filename.
    pub filename: String,
    // Default exposure time in second.
    pub exposure_time: f64,
    // Default guiding interval in second.
    pub guiding_interval: f64,
    // Default binning.
    pub binning: i32,
    // Readout timeout of the camera in second.
    pub readout_timeout: f64,
    // File of the calibration matrices.
    pub calibration_file: PathBuf,
    // Default shift of the calibration in digital units.
    pub calibration_shift: i32,
    // Directory of the calibration exposures and difference images.
    pub diagnostic_dir: PathBuf,
    // Directory of the correction history.
    pub history_dir: PathBuf,
    pub registration_tolerance: RegistrationTolerance,
    pub calibration_threshold: CalibrationThreshold,
}

impl Config {
    /// Create a new config object.
    ///
    /// # Arguments
    /// * `filepath` - The path to the guider parameters file.
    ///
    /// # Returns
    /// A new config object.
    ///
    /// # Errors
    /// If any parameter is missing or invalid.
    pub fn new(filepath: &Path) -> Result<Self, GuiderError> {
        let config = Self {
            filename: filepath.display().to_string(),

            exposure_time: get_parameter(filepath, "exposure_time")?,
            guiding_interval: get_parameter(filepath, "guiding_interval")?,
            binning: get_parameter(filepath, "binning")?,
            readout_timeout: get_parameter(filepath, "readout_timeout")?,

            calibration_file: PathBuf::from(get_parameter::<String>(
                filepath,
                "calibration_file",
            )?),
            calibration_shift: get_parameter(filepath, "calibration_shift")?,

            diagnostic_dir: PathBuf::from(get_parameter::<String>(filepath, "diagnostic_dir")?),
            history_dir: PathBuf::from(get_parameter::<String>(filepath, "history_dir")?),

            registration_tolerance: RegistrationTolerance {
                max_scale_deviation: get_parameter(filepath, "max_scale_deviation")?,
                max_rotation: get_parameter(filepath, "max_rotation")?,
            },
            calibration_threshold: CalibrationThreshold {
                min_axis_response: get_parameter(filepath, "min_axis_response")?,
                min_axis_sine: get_parameter(filepath, "min_axis_sine")?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate the parameters.
    ///
    /// # Errors
    /// If any parameter is out of range.
    fn validate(&self) -> Result<(), GuiderError> {
        for (name, value) in [
            ("exposure_time", self.exposure_time),
            ("guiding_interval", self.guiding_interval),
            ("readout_timeout", self.readout_timeout),
        ] {
            if !value.is_finite() || seconds_to_duration(value.abs()).is_none() {
                return Err(GuiderError::Config(format!(
                    "{name} should be a finite time in second but got {value}"
                )));
            }
        }

        if !(self.exposure_time > 0.0) {
            return Err(GuiderError::Config(String::from(
                "exposure_time should be > 0",
            )));
        }

        if !(self.guiding_interval >= 0.0) {
            return Err(GuiderError::Config(String::from(
                "guiding_interval should be >= 0",
            )));
        }

        if self.binning < 1 {
            return Err(GuiderError::Config(String::from("binning should be >= 1")));
        }

        if !(self.readout_timeout >= 0.0) {
            return Err(GuiderError::Config(String::from(
                "readout_timeout should be >= 0",
            )));
        }

        if self.calibration_shift == 0 {
            return Err(GuiderError::Config(String::from(
                "calibration_shift should not be 0",
            )));
        }

        let deadline = seconds_to_duration(self.exposure_time)
            .zip(seconds_to_duration(self.readout_timeout))
            .and_then(|(exposure_time, readout_timeout)| {
                exposure_time.checked_add(readout_timeout)
            });
        if deadline.is_none() {
            return Err(GuiderError::Config(String::from(
                "exposure_time + readout_timeout is too long",
            )));
        }

        Ok(())
    }

    /// Readout timeout.
    ///
    /// # Returns
    /// Readout timeout as a duration.
    ///
    /// # Errors
    /// GuiderError::Config if the readout timeout is not a valid time.
    pub fn readout_timeout(&self) -> Result<Duration, GuiderError> {
        seconds_to_duration(self.readout_timeout).ok_or_else(|| {
            GuiderError::Config(format!(
                "readout_timeout should be a finite time >= 0 but got {}",
                self.readout_timeout
            ))
        })
    }
}
