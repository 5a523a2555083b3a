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

use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::ThreadId;

use crate::config::Config;
use crate::control::calibration::CalibrationMatrix;
use crate::control::guiding_core::{Correction, GuidingCore};
use crate::control::guiding_process::GuidingWorker;
use crate::enums::ImageKind;
use crate::error::GuiderError;
use crate::hardware::camera::ExposureRequest;
use crate::hardware::rig::GuiderHardware;
use crate::status::GuiderState;
use crate::telemetry::correction_history::CorrectionHistory;
use crate::utility::seconds_to_duration;

/// Active optics guider. This keeps the star at the position of the reference
/// image by moving the image stabilization unit of the lens periodically.
pub struct ActiveOpticsGuider {
    _core: Arc<GuidingCore>,
    // Running guiding process.
    _worker: Option<GuidingWorker>,
}

impl ActiveOpticsGuider {
    /// Create a new guider.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    /// * `hardware` - Collaborators of the guider.
    ///
    /// # Returns
    /// New guider.
    pub fn new(config: Config, hardware: GuiderHardware) -> Self {
        Self {
            _core: Arc::new(GuidingCore::new(config, hardware)),
            _worker: None,
        }
    }

    /// Connect the camera and lens.
    ///
    /// # Errors
    /// If any device can not be connected.
    pub fn connect(&mut self) -> Result<(), GuiderError> {
        self._core.connect()
    }

    /// Stop the guiding and disconnect.
    pub fn disconnect(&mut self) {
        self.stop_guiding();
        self._core.disconnect();
    }

    /// Calibrate the image stabilization unit.
    ///
    /// # Arguments
    /// * `shift` - Shift of each trial in digital unit.
    ///
    /// # Returns
    /// Calibration.
    ///
    /// # Errors
    /// GuiderError::GuidingInProgress if the guiding is running, or any
    /// failure of the calibration.
    pub fn calibrate(&mut self, shift: i32) -> Result<CalibrationMatrix, GuiderError> {
        if self._worker.is_some() {
            return Err(GuiderError::GuidingInProgress);
        }

        self._core.calibrate(shift)
    }

    /// Start the guiding. This does nothing if the guiding is running
    /// already. A reference image is taken first if there is none.
    ///
    /// # Errors
    /// If the system is not connected or calibrated, or the reference image
    /// can not be taken.
    pub fn start_guiding(&mut self) -> Result<(), GuiderError> {
        if self._worker.is_some() {
            info!("Guiding is in progress already.");
            return Ok(());
        }

        let has_reference_image = {
            let state = self._core.state.lock();
            if !state.is_connected {
                return Err(GuiderError::NotConnected);
            }

            if !state.is_calibrated {
                return Err(GuiderError::NotCalibrated);
            }

            state.reference_image.is_some()
        };

        if !has_reference_image {
            self._core.take_reference_image()?;
        }

        info!("Starting the guiding process.");
        self._worker = Some(GuidingWorker::spawn(&self._core));
        self._core.state.lock().is_guiding = true;

        info!("Guiding started.");

        Ok(())
    }

    /// Stop the guiding. This returns after the running correction cycle is
    /// done, and no cycle starts afterwards.
    pub fn stop_guiding(&mut self) {
        if let Some(worker) = self._worker.take() {
            info!("Stopping the guiding process.");
            worker.stop();

            self._core.state.lock().is_guiding = false;
            info!("Guiding stopped.");
        }
    }

    /// Thread ID of the guiding process.
    ///
    /// # Returns
    /// Thread ID. None if the guiding is not running.
    pub fn guiding_thread_id(&self) -> Option<ThreadId> {
        self._worker.as_ref().map(GuidingWorker::thread_id)
    }

    /// Set the exposure time.
    ///
    /// # Arguments
    /// * `seconds` - Exposure time in second.
    ///
    /// # Errors
    /// GuiderError::InvalidParameter if the exposure time is not positive, or
    /// too long to build an exposure request.
    pub fn set_exposure_time(&self, seconds: f64) -> Result<(), GuiderError> {
        if !(seconds.is_finite() && (seconds > 0.0)) {
            return Err(GuiderError::InvalidParameter(format!(
                "exposure time should be > 0 but got {seconds}"
            )));
        }

        ExposureRequest::new(
            seconds,
            ImageKind::Light,
            None,
            1,
            self._core.config.readout_timeout()?,
        )?;

        info!("Setting the exposure time to {seconds} seconds.");
        self._core.state.lock().exposure_time = seconds;

        Ok(())
    }

    /// Set the guiding interval.
    ///
    /// # Arguments
    /// * `seconds` - Minimum time between two correction cycles in second.
    ///
    /// # Errors
    /// GuiderError::InvalidParameter if the interval is negative, or not a
    /// finite time.
    pub fn set_guiding_interval(&self, seconds: f64) -> Result<(), GuiderError> {
        if seconds_to_duration(seconds).is_none() {
            return Err(GuiderError::InvalidParameter(format!(
                "guiding interval should be a finite time >= 0 but got {seconds}"
            )));
        }

        info!("Setting the guiding interval to {seconds} seconds.");
        self._core.state.lock().guiding_interval = seconds;

        Ok(())
    }

    /// Set the binning.
    ///
    /// # Arguments
    /// * `binning` - Binning.
    ///
    /// # Errors
    /// GuiderError::InvalidParameter if the binning is less than 1.
    pub fn set_binning(&self, binning: i32) -> Result<(), GuiderError> {
        if binning < 1 {
            return Err(GuiderError::InvalidParameter(format!(
                "binning should be >= 1 but got {binning}"
            )));
        }

        info!("Setting the binning to {binning}.");
        self._core.state.lock().binning = binning;

        Ok(())
    }

    /// Get the status.
    ///
    /// # Returns
    /// Snapshot of the state.
    pub fn get_status(&self) -> GuiderState {
        let state = self._core.state.lock().clone();
        info!("Active optics guider status: {:?}", state);

        state
    }

    /// Clear the reference image. The next cycle uses the latest image of the
    /// camera as the reference image.
    pub fn clear_reference_image(&self) {
        self._core.state.lock().reference_image = None;
    }

    /// Stop the guiding, and clear the correction history and reference
    /// image.
    pub fn reset(&mut self) {
        self.stop_guiding();

        self._core.history.lock().clear();
        self.clear_reference_image();

        info!("Active optics guider is reset.");
    }

    /// Get the correction history.
    ///
    /// # Returns
    /// Snapshot of the correction history.
    pub fn correction_history(&self) -> CorrectionHistory {
        self._core.history.lock().clone()
    }

    /// Save the correction history.
    ///
    /// # Arguments
    /// * `filepath` - Path of the file. If None, the file is in the history
    /// directory with the name based on the time of the first correction.
    ///
    /// # Returns
    /// Path of the file.
    ///
    /// # Errors
    /// GuiderError::InvalidParameter if no filepath is given and the history
    /// is empty. GuiderError::Storage if the file can not be written.
    pub fn save_correction_history(
        &self,
        filepath: Option<&Path>,
    ) -> Result<PathBuf, GuiderError> {
        let history = self.correction_history();

        let filepath = match filepath {
            Some(path) => path.to_path_buf(),
            None => match history.default_filename() {
                Some(filename) => self._core.config.history_dir.join(filename),
                None => {
                    return Err(GuiderError::InvalidParameter(String::from(
                        "correction history is empty",
                    )))
                }
            },
        };

        history.save(&filepath)?;
        info!("Saved {} corrections to {:?}.", history.len(), filepath);

        Ok(filepath)
    }

    /// Run a single correction cycle on the caller's thread.
    ///
    /// # Returns
    /// Applied correction.
    ///
    /// # Errors
    /// Any failure of the cycle.
    pub fn perform_correction(&self) -> Result<Correction, GuiderError> {
        self._core.perform_correction()
    }
}

impl Drop for ActiveOpticsGuider {
    fn drop(&mut self) {
        self.stop_guiding();
    }
}
