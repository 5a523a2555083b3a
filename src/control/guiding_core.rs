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

use log::{info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::constants::{DIFFERENCE_IMAGE_AFTER, DIFFERENCE_IMAGE_BEFORE};
use crate::control::calibration::CalibrationMatrix;
use crate::control::calibration_solver::CalibrationSolver;
use crate::control::imaging::{register_images, save_difference_image, take_exposure};
use crate::control::math_tool::{pixel_to_actuator, round_to_digital_unit};
use crate::enums::ImageKind;
use crate::error::{DeviceError, GuiderError};
use crate::hardware::camera::ExposureRequest;
use crate::hardware::rig::GuiderHardware;
use crate::status::GuiderState;
use crate::telemetry::correction_history::CorrectionHistory;

/// Applied correction.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Correction {
    // Image offset (dx, dy) from the new image to the reference image in
    // pixel.
    pub offset: (f64, f64),
    // Move of the image stabilization unit in digital unit.
    pub delta: (i32, i32),
    // Commanded position of the image stabilization unit in digital unit.
    pub position: (i32, i32),
}

/// Everything shared by the operator and the guiding worker.
///
/// Lock order: hardware before state. The hardware lock is held for a whole
/// hardware activity (a correction cycle, calibration, or reference
/// exposure), and the state and history locks are only held briefly.
pub struct GuidingCore {
    pub config: Config,
    pub hardware: Mutex<GuiderHardware>,
    pub state: Mutex<GuiderState>,
    pub history: Mutex<CorrectionHistory>,
}

impl GuidingCore {
    /// Create the shared core.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    /// * `hardware` - Collaborators of the guider.
    ///
    /// # Returns
    /// New core.
    pub fn new(config: Config, hardware: GuiderHardware) -> Self {
        let state = GuiderState::new(&config);

        Self {
            config: config,
            hardware: Mutex::new(hardware),
            state: Mutex::new(state),
            history: Mutex::new(CorrectionHistory::new()),
        }
    }

    /// Connect the camera and lens, and unlock the image stabilization unit.
    /// The system is calibrated if the calibration file exists.
    ///
    /// # Errors
    /// If any device can not be connected.
    pub fn connect(&self) -> Result<(), GuiderError> {
        let mut hardware = self.hardware.lock();

        if !hardware.camera.is_connected() {
            info!("Connecting to the guide camera.");
            hardware.camera.connect().map_err(GuiderError::Imaging)?;
        }

        if !hardware.lens.is_connected() {
            info!("Connecting to the lens.");
            hardware.lens.connect().map_err(GuiderError::Actuator)?;
        }

        hardware.lens.activate().map_err(GuiderError::Actuator)?;

        let mut state = self.state.lock();
        state.is_connected = true;

        // Guiding runs only while calibrated.
        if !state.is_guiding {
            state.is_calibrated = CalibrationMatrix::exists(&self.config.calibration_file);
        }

        info!(
            "Active optics system connected (calibrated: {}).",
            state.is_calibrated
        );

        Ok(())
    }

    /// Lock the image stabilization unit and mark the system as
    /// disconnected. The guiding should be stopped already.
    pub fn disconnect(&self) {
        let mut hardware = self.hardware.lock();

        if hardware.lens.is_connected() {
            if let Err(error) = hardware.lens.deactivate() {
                warn!("Could not lock the image stabilization unit: {error}");
            }
        }

        self.state.lock().is_connected = false;

        info!("Active optics system disconnected.");
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
    /// GuiderError::NotConnected if the system is not connected.
    /// GuiderError::GuidingInProgress if the guiding is running. Any failure
    /// of the calibration.
    pub fn calibrate(&self, shift: i32) -> Result<CalibrationMatrix, GuiderError> {
        let mut hardware = self.hardware.lock();

        let (exposure_time, binning) = {
            let state = self.state.lock();
            if !state.is_connected {
                return Err(GuiderError::NotConnected);
            }

            if state.is_guiding {
                return Err(GuiderError::GuidingInProgress);
            }

            (state.exposure_time, state.binning)
        };

        let result = CalibrationSolver::new(&mut hardware, &self.config, exposure_time, binning)
            .calibrate(shift);

        // The matrix may be saved even if the final homing fails.
        self.state.lock().is_calibrated = CalibrationMatrix::exists(&self.config.calibration_file);

        result
    }

    /// Create the exposure request of the guiding from the current state.
    ///
    /// # Returns
    /// Exposure request with a generated filename.
    ///
    /// # Errors
    /// If the exposure time or readout timeout is not a valid time.
    fn create_exposure_request(&self) -> Result<ExposureRequest, GuiderError> {
        let readout_timeout = self.config.readout_timeout()?;
        let state = self.state.lock();

        ExposureRequest::new(
            state.exposure_time,
            ImageKind::Light,
            None,
            state.binning,
            readout_timeout,
        )
    }

    /// Take a new reference image.
    ///
    /// # Returns
    /// Path of the reference image.
    ///
    /// # Errors
    /// If the system is not connected or the exposure fails.
    pub fn take_reference_image(&self) -> Result<PathBuf, GuiderError> {
        let mut hardware = self.hardware.lock();

        if !self.state.lock().is_connected {
            return Err(GuiderError::NotConnected);
        }

        info!("Taking reference image.");
        let path = take_exposure(&mut hardware, &self.create_exposure_request()?)?;

        self.state.lock().reference_image = Some(path.clone());
        info!("Reference image: {:?}.", path);

        Ok(path)
    }

    /// Get the reference image. If it is not set, the latest image of the
    /// camera becomes the reference image.
    ///
    /// # Arguments
    /// * `hardware` - Collaborators of the guider.
    ///
    /// # Returns
    /// Path of the reference image.
    ///
    /// # Errors
    /// GuiderError::NoReferenceImage if there is no image, or the image does
    /// not exist.
    fn resolve_reference_image(
        &self,
        hardware: &GuiderHardware,
    ) -> Result<PathBuf, GuiderError> {
        let reference_image = {
            let mut state = self.state.lock();
            match &state.reference_image {
                Some(path) => Some(path.clone()),
                None => {
                    info!("Reference image is not set. Using the latest image as reference.");
                    state.reference_image = hardware.camera.latest_image();
                    state.reference_image.clone()
                }
            }
        };

        match reference_image {
            Some(path) if hardware.store.exists(&path) => Ok(path),
            Some(path) => Err(GuiderError::NoReferenceImage(format!(
                "{:?} does not exist",
                path
            ))),
            None => Err(GuiderError::NoReferenceImage(String::from(
                "no image has been taken",
            ))),
        }
    }

    /// Save the difference image for the diagnosis. Any failure is only
    /// logged.
    ///
    /// # Arguments
    /// * `hardware` - Collaborators of the guider.
    /// * `reference` - Path of the reference image.
    /// * `image` - Path of the image.
    /// * `name` - Filename in the diagnostic directory.
    fn save_diagnostic_image(
        &self,
        hardware: &GuiderHardware,
        reference: &Path,
        image: &Path,
        name: &str,
    ) {
        let output = self.config.diagnostic_dir.join(name);
        if let Err(error) = save_difference_image(hardware, reference, image, &output) {
            warn!("Could not create the difference image {:?}: {error}", output);
        }
    }

    /// Measure the image offset to the reference image and move the image
    /// stabilization unit to cancel it.
    ///
    /// # Returns
    /// Applied correction.
    ///
    /// # Errors
    /// GuiderError::NotConnected or GuiderError::NotCalibrated if the
    /// precondition is not met. GuiderError::NoReferenceImage if there is no
    /// reference image. Any registration, exposure, or lens failure. Nothing
    /// is moved if the registration fails.
    pub fn perform_correction(&self) -> Result<Correction, GuiderError> {
        let mut hardware = self.hardware.lock();

        {
            let state = self.state.lock();
            if !state.is_connected {
                return Err(GuiderError::NotConnected);
            }

            if !state.is_calibrated {
                return Err(GuiderError::NotCalibrated);
            }
        }

        info!("Initiating active optics correction.");

        let calibration = CalibrationMatrix::load(&self.config.calibration_file)?;
        let reference = self.resolve_reference_image(&hardware)?;

        let request = self.create_exposure_request()?;
        let image = take_exposure(&mut hardware, &request)?;

        self.save_diagnostic_image(&hardware, &reference, &image, DIFFERENCE_IMAGE_BEFORE);

        let transform = register_images(
            &hardware,
            &image,
            &reference,
            &self.config.registration_tolerance,
        )?;

        let (dx, dy) = transform.translation;
        info!("Image shift relative to the reference image: ({dx}, {dy}) pixel.");

        let (dx_unit, dy_unit) = pixel_to_actuator(&calibration.b, dx, dy);
        let delta = match (
            round_to_digital_unit(dx_unit),
            round_to_digital_unit(dy_unit),
        ) {
            (Some(dx_is), Some(dy_is)) => (dx_is, dy_is),
            _ => {
                return Err(GuiderError::Actuator(DeviceError::OutOfRange(format!(
                    "correction ({dx_unit}, {dy_unit}) is not a digital unit"
                ))))
            }
        };

        let (x, y) = hardware.lens.get_xy().map_err(GuiderError::Actuator)?;
        let position = match (x.checked_add(delta.0), y.checked_add(delta.1)) {
            (Some(x_new), Some(y_new)) => (x_new, y_new),
            _ => {
                return Err(GuiderError::Actuator(DeviceError::OutOfRange(format!(
                    "({x}, {y}) + {:?} overflows",
                    delta
                ))))
            }
        };

        info!(
            "Translating image stabilization unit by {:?} digital units from ({x}, {y}) to {:?}.",
            delta, position
        );
        hardware
            .lens
            .move_to(position.0, position.1)
            .map_err(GuiderError::Actuator)?;

        match take_exposure(&mut hardware, &request) {
            Ok(image_verification) => self.save_diagnostic_image(
                &hardware,
                &reference,
                &image_verification,
                DIFFERENCE_IMAGE_AFTER,
            ),
            Err(error) => warn!("Could not take the verification exposure: {error}"),
        }

        self.history.lock().add_point(dx, dy);
        info!("Image alignment completed.");

        Ok(Correction {
            offset: (dx, dy),
            delta: delta,
            position: position,
        })
    }
}
