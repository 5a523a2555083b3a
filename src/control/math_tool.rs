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
use num_traits::ToPrimitive;

/// Calculate the determinant of a 2 x 2 matrix.
///
/// # Arguments
/// * `m` - Matrix.
///
/// # Returns
/// Determinant.
pub fn determinant_2x2(m: &Matrix2<f64>) -> f64 {
    m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]
}

/// Calculate the inverse of a 2 x 2 matrix in the closed form:
///
/// [[a, b], [c, d]]^(-1) = 1 / (ad - bc) * [[d, -b], [-c, a]]
///
/// # Arguments
/// * `m` - Matrix.
///
/// # Returns
/// Inverse matrix. None if the matrix is singular.
pub fn inverse_2x2(m: &Matrix2<f64>) -> Option<Matrix2<f64>> {
    let determinant = determinant_2x2(m);
    if (determinant == 0.0) || !determinant.is_finite() {
        return None;
    }

    Some(
        Matrix2::new(m[(1, 1)], -m[(0, 1)], -m[(1, 0)], m[(0, 0)]) / determinant,
    )
}

/// Calculate the sine of the angle between the two rows of a 2 x 2 matrix.
/// This is |det(m)| / (|row_1| * |row_2|). A value close to 0 means the rows
/// are nearly parallel.
///
/// # Arguments
/// * `m` - Matrix.
///
/// # Returns
/// Sine of the angle. 0.0 if any row has the zero length.
pub fn sine_between_rows(m: &Matrix2<f64>) -> f64 {
    let norm = m.row(0).norm() * m.row(1).norm();
    if norm == 0.0 {
        return 0.0;
    }

    determinant_2x2(m).abs() / norm
}

/// Convert the image displacement in pixel to the displacement of the image
/// stabilization unit in digital unit:
///
/// dx_act = b11 * dx + b12 * dy
/// dy_act = b21 * dx + b22 * dy
///
/// # Arguments
/// * `b` - Correction matrix (pixel to digital unit).
/// * `dx` - Displacement in x in pixel.
/// * `dy` - Displacement in y in pixel.
///
/// # Returns
/// Displacement (x, y) in digital unit.
pub fn pixel_to_actuator(b: &Matrix2<f64>, dx: f64, dy: f64) -> (f64, f64) {
    let displacement = b * Vector2::new(dx, dy);

    (displacement[0], displacement[1])
}

/// Round the value to the nearest digital unit.
///
/// # Arguments
/// * `value` - Value to round.
///
/// # Returns
/// Rounded value. None if the value is not finite or out of the range of i32.
pub fn round_to_digital_unit(value: f64) -> Option<i32> {
    value.round().to_i32()
}
