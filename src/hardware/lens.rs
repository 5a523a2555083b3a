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

use crate::enums::Axis;
use crate::error::DeviceError;

/// Image stabilization unit of the lens. This is a two-axis actuator with an
/// integer setpoint (digital unit) on each axis.
pub trait StabilizationActuator {
    /// The lens is connected or not.
    fn is_connected(&self) -> bool;

    /// Connect the lens.
    ///
    /// # Errors
    /// If the lens can not be connected.
    fn connect(&mut self) -> Result<(), DeviceError>;

    /// Unlock the image stabilization unit.
    fn activate(&mut self) -> Result<(), DeviceError>;

    /// Lock the image stabilization unit.
    fn deactivate(&mut self) -> Result<(), DeviceError>;

    /// Get the position.
    ///
    /// # Returns
    /// Position (x, y) in digital unit.
    fn get_xy(&mut self) -> Result<(i32, i32), DeviceError>;

    /// Set the x position.
    fn set_x(&mut self, x: i32) -> Result<(), DeviceError>;

    /// Set the y position.
    fn set_y(&mut self, y: i32) -> Result<(), DeviceError>;

    /// Set the position of a single axis.
    ///
    /// # Arguments
    /// * `axis` - Axis to move.
    /// * `position` - Position in digital unit.
    fn set_axis(&mut self, axis: Axis, position: i32) -> Result<(), DeviceError> {
        match axis {
            Axis::X => self.set_x(position),
            Axis::Y => self.set_y(position),
        }
    }

    /// Move to the position. The default moves the x-axis and then the y-axis
    /// with two independent calls, which is not atomic. A lens with a
    /// combined move should override this.
    ///
    /// # Arguments
    /// * `x` - Position of the x-axis in digital unit.
    /// * `y` - Position of the y-axis in digital unit.
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.set_x(x)?;
        self.set_y(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LensTest {
        commands: Vec<String>,
        is_failed_y: bool,
    }

    impl StabilizationActuator for LensTest {
        fn is_connected(&self) -> bool {
            true
        }

        fn connect(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn activate(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn deactivate(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn get_xy(&mut self) -> Result<(i32, i32), DeviceError> {
            Ok((0, 0))
        }

        fn set_x(&mut self, x: i32) -> Result<(), DeviceError> {
            self.commands.push(format!("x={x}"));
            Ok(())
        }

        fn set_y(&mut self, y: i32) -> Result<(), DeviceError> {
            if self.is_failed_y {
                return Err(DeviceError::Communication(String::from("no reply")));
            }

            self.commands.push(format!("y={y}"));
            Ok(())
        }
    }

    #[test]
    fn test_move_to() {
        let mut lens = LensTest {
            commands: Vec::new(),
            is_failed_y: false,
        };

        lens.move_to(3, -4).unwrap();
        lens.set_axis(Axis::Y, 7).unwrap();

        assert_eq!(lens.commands, vec!["x=3", "y=-4", "y=7"]);
    }

    #[test]
    fn test_move_to_partial() {
        let mut lens = LensTest {
            commands: Vec::new(),
            is_failed_y: true,
        };

        // The x-axis has moved already when the y-axis fails.
        assert!(lens.move_to(3, -4).is_err());
        assert_eq!(lens.commands, vec!["x=3"]);
    }
}
