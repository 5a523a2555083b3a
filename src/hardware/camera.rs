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

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::enums::ImageKind;
use crate::error::{DeviceError, GuiderError};
use crate::utility::seconds_to_duration;

/// Request of an exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRequest {
    // Exposure time.
    pub exposure_time: Duration,
    // Kind of the image.
    pub kind: ImageKind,
    // Filename of the image. The camera picks one if None.
    pub filename: Option<PathBuf>,
    // Binning.
    pub binning: i32,
    // The exposure and readout should complete within this time.
    pub timeout: Duration,
}

impl ExposureRequest {
    /// Create a new exposure request.
    ///
    /// # Arguments
    /// * `exposure_time` - Exposure time in second.
    /// * `kind` - Kind of the image.
    /// * `filename` - Optional filename of the image.
    /// * `binning` - Binning.
    /// * `readout_timeout` - Readout timeout.
    ///
    /// # Returns
    /// A new exposure request. The timeout is the sum of the exposure time
    /// and the readout timeout.
    ///
    /// # Errors
    /// GuiderError::InvalidParameter if the exposure time is not a valid
    /// time, or the timeout is too long.
    pub fn new(
        exposure_time: f64,
        kind: ImageKind,
        filename: Option<&Path>,
        binning: i32,
        readout_timeout: Duration,
    ) -> Result<Self, GuiderError> {
        let exposure_time_valid = seconds_to_duration(exposure_time).ok_or_else(|| {
            GuiderError::InvalidParameter(format!(
                "exposure time should be a finite time >= 0 but got {exposure_time}"
            ))
        })?;
        let timeout = exposure_time_valid
            .checked_add(readout_timeout)
            .ok_or_else(|| {
                GuiderError::InvalidParameter(format!(
                    "exposure time of {exposure_time} seconds is too long"
                ))
            })?;

        Ok(Self {
            exposure_time: exposure_time_valid,
            kind: kind,
            filename: filename.map(Path::to_path_buf),
            binning: binning,
            timeout: timeout,
        })
    }
}

/// Guide camera.
pub trait ImagingDevice {
    /// The camera is connected or not.
    fn is_connected(&self) -> bool;

    /// Connect the camera.
    ///
    /// # Errors
    /// If the camera can not be connected.
    fn connect(&mut self) -> Result<(), DeviceError>;

    /// Take an exposure. This blocks until the image is read out or the
    /// timeout of the request is reached.
    ///
    /// # Arguments
    /// * `request` - Exposure request.
    ///
    /// # Returns
    /// Path of the image.
    ///
    /// # Errors
    /// If the exposure fails or times out.
    fn expose(&mut self, request: &ExposureRequest) -> Result<PathBuf, DeviceError>;

    /// Path of the latest image.
    ///
    /// # Returns
    /// Path of the latest image. None if there is no image yet.
    fn latest_image(&self) -> Option<PathBuf>;
}
