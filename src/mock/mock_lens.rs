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

use parking_lot::Mutex;
use std::sync::Arc;

use crate::enums::Axis;
use crate::error::DeviceError;
use crate::hardware::lens::StabilizationActuator;
use crate::mock::mock_constants::LENS_POSITION_LIMIT;
use crate::mock::mock_plant::MockPlant;

/// Simulated image stabilization unit. Every accepted setpoint is recorded in
/// the command log.
pub struct MockLens {
    _plant: MockPlant,
    _is_connected: bool,
    _is_active: bool,
    _commands: Arc<Mutex<Vec<(Axis, i32)>>>,
}

impl MockLens {
    /// Create a new lens.
    ///
    /// # Arguments
    /// * `plant` - Simulated telescope.
    ///
    /// # Returns
    /// New lens.
    pub fn new(plant: &MockPlant) -> Self {
        Self {
            _plant: plant.clone(),
            _is_connected: false,
            _is_active: false,
            _commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the command log. The log is shared with the lens.
    ///
    /// # Returns
    /// Command log.
    pub fn command_log(&self) -> Arc<Mutex<Vec<(Axis, i32)>>> {
        self._commands.clone()
    }

    /// Check the lens can move to the position.
    ///
    /// # Arguments
    /// * `position` - Position in digital unit.
    ///
    /// # Errors
    /// If the lens is not connected, locked, or the position is out of range.
    fn check_movable(&self, position: i32) -> Result<(), DeviceError> {
        if !self._is_connected {
            return Err(DeviceError::NotConnected);
        }

        if !self._is_active {
            return Err(DeviceError::Communication(String::from(
                "image stabilization unit is locked",
            )));
        }

        if position.abs() > LENS_POSITION_LIMIT {
            return Err(DeviceError::OutOfRange(format!(
                "{position} is beyond +/-{LENS_POSITION_LIMIT}"
            )));
        }

        Ok(())
    }
}

impl StabilizationActuator for MockLens {
    fn is_connected(&self) -> bool {
        self._is_connected
    }

    fn connect(&mut self) -> Result<(), DeviceError> {
        self._is_connected = true;

        Ok(())
    }

    fn activate(&mut self) -> Result<(), DeviceError> {
        if !self._is_connected {
            return Err(DeviceError::NotConnected);
        }

        self._is_active = true;

        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), DeviceError> {
        if !self._is_connected {
            return Err(DeviceError::NotConnected);
        }

        self._is_active = false;

        Ok(())
    }

    fn get_xy(&mut self) -> Result<(i32, i32), DeviceError> {
        if !self._is_connected {
            return Err(DeviceError::NotConnected);
        }

        Ok(self._plant.lens_position())
    }

    fn set_x(&mut self, x: i32) -> Result<(), DeviceError> {
        self.check_movable(x)?;

        let (_, y) = self._plant.lens_position();
        self._plant.set_lens_position(x, y);
        self._commands.lock().push((Axis::X, x));

        Ok(())
    }

    fn set_y(&mut self, y: i32) -> Result<(), DeviceError> {
        self.check_movable(y)?;

        let (x, _) = self._plant.lens_position();
        self._plant.set_lens_position(x, y);
        self._commands.lock().push((Axis::Y, y));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use crate::mock::mock_plant::SimulationConfig;

    fn create_mock_lens() -> (MockLens, MockPlant) {
        let plant = MockPlant::new(
            SimulationConfig::new(Path::new("config/parameters_simulation.yaml")).unwrap(),
        );

        (MockLens::new(&plant), plant)
    }

    #[test]
    fn test_move_to() {
        let (mut lens, plant) = create_mock_lens();
        let log = lens.command_log();

        lens.connect().unwrap();
        lens.activate().unwrap();
        lens.move_to(10, -20).unwrap();

        assert_eq!(lens.get_xy().unwrap(), (10, -20));
        assert_eq!(plant.lens_position(), (10, -20));
        assert_eq!(*log.lock(), vec![(Axis::X, 10), (Axis::Y, -20)]);
    }

    #[test]
    fn test_set_x_error() {
        let (mut lens, _) = create_mock_lens();

        assert_eq!(lens.set_x(1), Err(DeviceError::NotConnected));

        lens.connect().unwrap();
        assert!(matches!(lens.set_x(1), Err(DeviceError::Communication(_))));

        lens.activate().unwrap();
        assert!(matches!(
            lens.set_x(LENS_POSITION_LIMIT + 1),
            Err(DeviceError::OutOfRange(_))
        ));

        assert!(lens.command_log().lock().is_empty());
    }
}
