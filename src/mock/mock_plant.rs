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

use nalgebra::{Matrix2, Vector2};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GuiderError;
use crate::image::frame::Frame;
use crate::utility::{
    get_parameter, get_parameter_array, get_parameter_matrix, seconds_to_duration,
};

/// Parameters of the simulated telescope.
#[derive(Clone, PartialEq, Debug)]
pub struct SimulationConfig {
    // Sensor size (width, height) in pixel.
    pub sensor_size: (usize, usize),
    // Star position (x, y) in pixel when the lens is at home.
    pub star_position: Vector2<f64>,
    // Peak of the star above the background.
    pub star_peak: f64,
    // Gaussian sigma of the star in pixel.
    pub star_sigma: f64,
    // Sky background.
    pub background: f64,
    // Image displacement per digital unit. The first row is the response of
    // the x-axis, and the second row is the one of the y-axis.
    pub response: Matrix2<f64>,
    // Drift of the star in pixel per second of exposure.
    pub drift_rate: Vector2<f64>,
    // Readout time of the camera in second.
    pub readout_time: f64,
}

impl SimulationConfig {
    /// Read the simulation parameters.
    ///
    /// # Arguments
    /// * `filepath` - Path of the simulation parameters file.
    ///
    /// # Returns
    /// Simulation parameters.
    ///
    /// # Errors
    /// If any parameter is missing or has the wrong dimension.
    pub fn new(filepath: &Path) -> Result<Self, GuiderError> {
        let star_position = get_parameter_array::<f64>(filepath, "star_position")?;
        let drift_rate = get_parameter_array::<f64>(filepath, "drift_rate")?;
        let response = get_parameter_matrix::<f64>(filepath, "response")?;

        if (star_position.len() != 2)
            || (drift_rate.len() != 2)
            || (response.len() != 2)
            || response.iter().any(|row| row.len() != 2)
        {
            return Err(GuiderError::Config(format!(
                "star_position, drift_rate, and response in {:?} should be two-dimensional",
                filepath
            )));
        }

        Ok(Self {
            sensor_size: (
                get_parameter(filepath, "sensor_width")?,
                get_parameter(filepath, "sensor_height")?,
            ),
            star_position: Vector2::new(star_position[0], star_position[1]),
            star_peak: get_parameter(filepath, "star_peak")?,
            star_sigma: get_parameter(filepath, "star_sigma")?,
            background: get_parameter(filepath, "background")?,
            response: Matrix2::new(
                response[0][0],
                response[0][1],
                response[1][0],
                response[1][1],
            ),
            drift_rate: Vector2::new(drift_rate[0], drift_rate[1]),
            readout_time: get_parameter(filepath, "readout_time")?,
        })
    }
}

struct PlantState {
    // Lens position (x, y) in digital unit.
    lens_position: (i32, i32),
    // Accumulated exposure time in second.
    elapsed_time: f64,
}

/// Simulated telescope shared by the mock camera and lens. The star drifts
/// with the accumulated exposure time and moves with the lens position.
#[derive(Clone)]
pub struct MockPlant {
    pub config: SimulationConfig,
    _state: Arc<Mutex<PlantState>>,
}

impl MockPlant {
    /// Create a new plant with the lens at home.
    ///
    /// # Arguments
    /// * `config` - Simulation parameters.
    ///
    /// # Returns
    /// New plant.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config: config,
            _state: Arc::new(Mutex::new(PlantState {
                lens_position: (0, 0),
                elapsed_time: 0.0,
            })),
        }
    }

    /// Lens position.
    ///
    /// # Returns
    /// Position (x, y) in digital unit.
    pub fn lens_position(&self) -> (i32, i32) {
        self._state.lock().lens_position
    }

    /// Set the lens position.
    ///
    /// # Arguments
    /// * `x` - Position of the x-axis in digital unit.
    /// * `y` - Position of the y-axis in digital unit.
    pub fn set_lens_position(&self, x: i32, y: i32) {
        self._state.lock().lens_position = (x, y);
    }

    /// Star position on the sensor.
    ///
    /// # Returns
    /// Position (x, y) in pixel.
    pub fn star_position(&self) -> Vector2<f64> {
        let state = self._state.lock();
        let lens = Vector2::new(state.lens_position.0 as f64, state.lens_position.1 as f64);

        self.config.star_position
            + self.config.drift_rate * state.elapsed_time
            + self.config.response.transpose() * lens
    }

    /// Readout time of the camera.
    ///
    /// # Returns
    /// Readout time.
    pub fn readout_time(&self) -> Duration {
        seconds_to_duration(self.config.readout_time).unwrap_or(Duration::ZERO)
    }

    /// Expose the sensor.
    ///
    /// # Arguments
    /// * `exposure_time` - Exposure time in second.
    /// * `binning` - Binning.
    ///
    /// # Returns
    /// Rendered frame.
    pub fn expose(&self, exposure_time: f64, binning: i32) -> Frame {
        let star = self.star_position();
        self._state.lock().elapsed_time += exposure_time.max(0.0);

        let binning = binning.max(1) as usize;
        let (width, height) = self.config.sensor_size;
        let scale = binning as f64;

        let x0 = star[0] / scale;
        let y0 = star[1] / scale;
        let sigma = self.config.star_sigma / scale;
        let denominator = 2.0 * sigma * sigma;

        Frame::from_fn(height / binning, width / binning, |row, column| {
            let dx = (column as f64) - x0;
            let dy = (row as f64) - y0;
            let value = self.config.background
                + self.config.star_peak * (-(dx * dx + dy * dy) / denominator).exp();

            value as f32
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn create_mock_plant() -> MockPlant {
        let mut config =
            SimulationConfig::new(Path::new("config/parameters_simulation.yaml")).unwrap();
        config.response = Matrix2::new(0.1, 0.01, 0.02, -0.08);
        config.drift_rate = Vector2::new(0.5, -0.25);

        MockPlant::new(config)
    }

    #[test]
    fn test_new_config() {
        let config = SimulationConfig::new(Path::new("config/parameters_simulation.yaml")).unwrap();

        assert_eq!(config.sensor_size, (128, 128));
        assert_eq!(config.star_position, Vector2::new(64.0, 32.0));
        assert_eq!(config.response, Matrix2::new(0.02, 0.002, 0.002, -0.025));
        assert_relative_eq!(config.readout_time, 0.1);
    }

    #[test]
    fn test_star_position() {
        let plant = create_mock_plant();

        assert_eq!(plant.star_position(), Vector2::new(64.0, 32.0));

        // Response of the x-axis
        plant.set_lens_position(100, 0);
        assert_relative_eq!(plant.star_position(), Vector2::new(74.0, 33.0), epsilon = 1e-12);

        // Response of the y-axis
        plant.set_lens_position(0, 100);
        assert_relative_eq!(plant.star_position(), Vector2::new(66.0, 24.0), epsilon = 1e-12);
    }

    #[test]
    fn test_expose() {
        let plant = create_mock_plant();

        let frame = plant.expose(2.0, 1);

        assert_eq!(frame.shape(), (128, 128));

        // (row, column) = (y, x)
        assert_relative_eq!(frame[(32, 64)], 2100.0);
        assert_relative_eq!(frame[(0, 0)], 100.0, epsilon = 1e-3);

        // Drift after the exposure
        assert_relative_eq!(plant.star_position(), Vector2::new(65.0, 31.5), epsilon = 1e-12);
    }

    #[test]
    fn test_expose_binning() {
        let plant = create_mock_plant();

        let frame = plant.expose(0.0, 2);

        assert_eq!(frame.shape(), (64, 64));
        assert_relative_eq!(frame[(16, 32)], 2100.0);
    }
}
