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

use log::{error, info};
use nalgebra::Matrix2;
use std::path::PathBuf;

use crate::config::{CalibrationThreshold, Config};
use crate::constants::{CALIBRATION_BASELINE_IMAGE, CALIBRATION_SHIFTED_IMAGE};
use crate::control::calibration::CalibrationMatrix;
use crate::control::imaging::{home, register_images, take_exposure};
use crate::control::math_tool::sine_between_rows;
use crate::enums::{Axis, ImageKind};
use crate::error::GuiderError;
use crate::hardware::camera::ExposureRequest;
use crate::hardware::rig::GuiderHardware;

/// Solver of the calibration. This moves the image stabilization unit along
/// each axis and measures the image displacement to get the forward matrix
/// from digital unit to pixel.
pub struct CalibrationSolver<'a> {
    _hardware: &'a mut GuiderHardware,
    _config: &'a Config,
    // Exposure time in second.
    _exposure_time: f64,
    _binning: i32,
}

impl<'a> CalibrationSolver<'a> {
    /// Create a new calibration solver.
    ///
    /// # Arguments
    /// * `hardware` - Collaborators of the guider.
    /// * `config` - Configuration.
    /// * `exposure_time` - Exposure time in second.
    /// * `binning` - Binning.
    ///
    /// # Returns
    /// New calibration solver.
    pub fn new(
        hardware: &'a mut GuiderHardware,
        config: &'a Config,
        exposure_time: f64,
        binning: i32,
    ) -> Self {
        Self {
            _hardware: hardware,
            _config: config,
            _exposure_time: exposure_time,
            _binning: binning,
        }
    }

    /// Calibrate the image stabilization unit and save the result. The unit is
    /// moved back to home at the end no matter the calibration succeeds or
    /// not.
    ///
    /// # Arguments
    /// * `shift` - Shift of each trial in digital unit.
    ///
    /// # Returns
    /// Calibration.
    ///
    /// # Errors
    /// GuiderError::InvalidParameter if the shift is 0.
    /// GuiderError::Calibration if any trial can not be registered or the
    /// response is degenerate. Any hardware or storage error is returned as
    /// is.
    pub fn calibrate(&mut self, shift: i32) -> Result<CalibrationMatrix, GuiderError> {
        if shift == 0 {
            return Err(GuiderError::InvalidParameter(String::from(
                "calibration shift should not be 0",
            )));
        }

        info!(
            "Starting image stabilization unit calibration run with the shift of {shift} digital units."
        );

        let result = self.solve(shift);
        let result_home = home(self._hardware);

        let calibration = match (result, result_home) {
            (Ok(calibration), Ok(())) => calibration,
            (Ok(_), Err(error_home)) => return Err(error_home),
            (Err(error_solve), result_home) => {
                if let Err(error_home) = result_home {
                    error!("Failed to home the image stabilization unit: {error_home}");
                }
                return Err(error_solve);
            }
        };

        info!(
            "Calibration is done. A: {:?}, B: {:?}.",
            calibration.a.as_slice(),
            calibration.b.as_slice()
        );

        Ok(calibration)
    }

    /// Run both trials and save the calibration.
    ///
    /// # Arguments
    /// * `shift` - Shift of each trial in digital unit.
    ///
    /// # Returns
    /// Calibration.
    fn solve(&mut self, shift: i32) -> Result<CalibrationMatrix, GuiderError> {
        self._hardware
            .lens
            .activate()
            .map_err(GuiderError::Actuator)?;

        let (a11, a12) = self.measure_axis(Axis::X, shift)?;
        let (a21, a22) = self.measure_axis(Axis::Y, shift)?;

        let a = Matrix2::new(a11, a12, a21, a22);
        Self::check_degeneracy(&a, &self._config.calibration_threshold)?;

        let calibration = CalibrationMatrix::from_forward(a)?;
        calibration.save(&self._config.calibration_file)?;

        info!(
            "Calibration is saved to {:?}.",
            self._config.calibration_file
        );

        Ok(calibration)
    }

    /// Measure the image displacement per digital unit of a single axis.
    ///
    /// # Arguments
    /// * `axis` - Axis to move.
    /// * `shift` - Shift in digital unit.
    ///
    /// # Returns
    /// Image displacement (dx, dy) per digital unit.
    fn measure_axis(&mut self, axis: Axis, shift: i32) -> Result<(f64, f64), GuiderError> {
        home(self._hardware)?;

        let baseline = self.expose(CALIBRATION_BASELINE_IMAGE)?;

        info!("Shifting the {axis}-axis by {shift} digital units.");
        self._hardware
            .lens
            .set_axis(axis, shift)
            .map_err(GuiderError::Actuator)?;

        let shifted = self.expose(CALIBRATION_SHIFTED_IMAGE)?;

        let transform = register_images(
            self._hardware,
            &baseline,
            &shifted,
            &self._config.registration_tolerance,
        )
        .map_err(|error| match error {
            GuiderError::Registration(_) | GuiderError::RegistrationQuality { .. } => {
                GuiderError::Calibration(format!("{axis}-axis trial is not registered ({error})"))
            }
            _ => error,
        })?;

        let (dx, dy) = transform.translation;
        info!("Image displacement of the {axis}-axis trial: ({dx}, {dy}) pixel.");

        Ok((dx / (shift as f64), dy / (shift as f64)))
    }

    /// Take an exposure of the calibration.
    ///
    /// # Arguments
    /// * `name` - Filename in the diagnostic directory.
    ///
    /// # Returns
    /// Path of the image.
    fn expose(&mut self, name: &str) -> Result<PathBuf, GuiderError> {
        let filename = self._config.diagnostic_dir.join(name);
        let request = ExposureRequest::new(
            self._exposure_time,
            ImageKind::Light,
            Some(&filename),
            self._binning,
            self._config.readout_timeout()?,
        )?;

        take_exposure(self._hardware, &request)
    }

    /// Check the forward matrix is not degenerate.
    ///
    /// # Arguments
    /// * `a` - Forward matrix.
    /// * `threshold` - Threshold of the degeneracy.
    ///
    /// # Errors
    /// GuiderError::Calibration if any axis has no response or both axes
    /// respond in (nearly) the same direction.
    fn check_degeneracy(
        a: &Matrix2<f64>,
        threshold: &CalibrationThreshold,
    ) -> Result<(), GuiderError> {
        for (axis, row) in [(Axis::X, 0), (Axis::Y, 1)] {
            let response = a.row(row).norm();
            if !(response >= threshold.min_axis_response) {
                return Err(GuiderError::Calibration(format!(
                    "{axis}-axis response of {response} pixel per digital unit is too small"
                )));
            }
        }

        let sine = sine_between_rows(a);
        if !(sine > threshold.min_axis_sine) {
            return Err(GuiderError::Calibration(format!(
                "responses of both axes are nearly parallel (sine of angle: {sine})"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    use crate::hardware::camera::ImagingDevice;
    use crate::hardware::lens::StabilizationActuator;
    use crate::image::frame::ImageStore;
    use crate::image::registration::{ImageRegistrar, SimilarityTransform};
    use crate::mock::{
        mock_camera::MockCamera,
        mock_image_store::MockImageStore,
        mock_lens::MockLens,
        mock_plant::{MockPlant, SimulationConfig},
        mock_registrar::{CentroidRegistrar, ScriptedRegistrar},
    };

    fn create_config(dir: &TempDir) -> Config {
        let mut config = Config::new(Path::new("config/parameters_guider.yaml")).unwrap();
        config.calibration_file = dir.path().join("is_calibration.json");
        config.diagnostic_dir = dir.path().to_path_buf();

        config
    }

    fn create_hardware(
        response: Matrix2<f64>,
        registrar: Box<dyn ImageRegistrar + Send>,
    ) -> (GuiderHardware, MockPlant, MockImageStore) {
        let mut config =
            SimulationConfig::new(Path::new("config/parameters_simulation.yaml")).unwrap();
        config.response = response;
        config.drift_rate = Vector2::zeros();

        let plant = MockPlant::new(config);
        let store = MockImageStore::new();

        let mut lens = MockLens::new(&plant);
        lens.connect().unwrap();

        let mut camera = MockCamera::new(&plant, &store).with_delay(Duration::ZERO);
        camera.connect().unwrap();

        (
            GuiderHardware::new(
                Box::new(camera),
                Box::new(lens),
                registrar,
                Box::new(store.clone()),
            ),
            plant,
            store,
        )
    }

    #[test]
    fn test_calibrate() {
        let dir = tempdir().unwrap();
        let config = create_config(&dir);

        let response = Matrix2::new(0.1, 0.01, 0.02, -0.08);
        for shift in [50, -50, 100] {
            let (mut hardware, plant, store) =
                create_hardware(response, Box::new(CentroidRegistrar));

            let calibration = CalibrationSolver::new(&mut hardware, &config, 15.0, 1)
                .calibrate(shift)
                .unwrap();

            assert_relative_eq!(calibration.a, response, epsilon = 2e-3);
            assert_relative_eq!(
                calibration.a * calibration.b,
                Matrix2::identity(),
                epsilon = 1e-9
            );

            // Back to home
            assert_eq!(plant.lens_position(), (0, 0));

            // Saved
            let calibration_loaded = CalibrationMatrix::load(&config.calibration_file).unwrap();
            assert_relative_eq!(calibration_loaded.b, calibration.b, epsilon = 1e-12);

            // Trial images are kept
            assert!(store.exists(&dir.path().join(CALIBRATION_BASELINE_IMAGE)));
            assert!(store.exists(&dir.path().join(CALIBRATION_SHIFTED_IMAGE)));
        }
    }

    #[test]
    fn test_calibrate_parallel() {
        let dir = tempdir().unwrap();
        let config = create_config(&dir);

        let (mut hardware, plant, _) = create_hardware(
            Matrix2::new(0.1, 0.05, 0.2, 0.1),
            Box::new(CentroidRegistrar),
        );

        let result = CalibrationSolver::new(&mut hardware, &config, 15.0, 1).calibrate(50);

        assert!(matches!(result, Err(GuiderError::Calibration(_))));
        assert_eq!(plant.lens_position(), (0, 0));
        assert!(!CalibrationMatrix::exists(&config.calibration_file));
    }

    #[test]
    fn test_calibrate_no_response() {
        let dir = tempdir().unwrap();
        let config = create_config(&dir);

        let (mut hardware, _, _) = create_hardware(
            Matrix2::new(0.1, 0.0, 0.0, 0.0),
            Box::new(CentroidRegistrar),
        );

        let result = CalibrationSolver::new(&mut hardware, &config, 15.0, 1).calibrate(50);

        assert!(matches!(result, Err(GuiderError::Calibration(message)) if message.contains("Y-axis")));
    }

    #[test]
    fn test_calibrate_no_match() {
        let dir = tempdir().unwrap();
        let config = create_config(&dir);

        let (mut hardware, plant, _) = create_hardware(
            Matrix2::identity(),
            Box::new(ScriptedRegistrar::no_match()),
        );

        let result = CalibrationSolver::new(&mut hardware, &config, 15.0, 1).calibrate(50);

        assert!(matches!(result, Err(GuiderError::Calibration(message)) if message.contains("X-axis")));
        assert_eq!(plant.lens_position(), (0, 0));
    }

    #[test]
    fn test_calibrate_bad_quality() {
        let dir = tempdir().unwrap();
        let config = create_config(&dir);

        let mut transform = SimilarityTransform::from_translation(5.0, 0.0);
        transform.rotation = 0.5;
        let (mut hardware, _, _) = create_hardware(
            Matrix2::identity(),
            Box::new(ScriptedRegistrar::new(transform)),
        );

        let result = CalibrationSolver::new(&mut hardware, &config, 15.0, 1).calibrate(50);

        assert!(matches!(result, Err(GuiderError::Calibration(_))));
    }

    #[test]
    fn test_calibrate_zero_shift() {
        let dir = tempdir().unwrap();
        let config = create_config(&dir);

        let (mut hardware, _, store) =
            create_hardware(Matrix2::identity(), Box::new(CentroidRegistrar));

        let result = CalibrationSolver::new(&mut hardware, &config, 15.0, 1).calibrate(0);

        assert!(matches!(result, Err(GuiderError::InvalidParameter(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_check_degeneracy() {
        let threshold = CalibrationThreshold {
            min_axis_response: 1e-4,
            min_axis_sine: 0.05,
        };

        assert!(CalibrationSolver::check_degeneracy(
            &Matrix2::new(0.02, 0.002, 0.002, -0.025),
            &threshold
        )
        .is_ok());

        assert!(CalibrationSolver::check_degeneracy(
            &Matrix2::new(0.02, 0.002, 0.04, 0.004),
            &threshold
        )
        .is_err());

        assert!(CalibrationSolver::check_degeneracy(
            &Matrix2::new(f64::NAN, 0.002, 0.002, -0.025),
            &threshold
        )
        .is_err());
    }
}
