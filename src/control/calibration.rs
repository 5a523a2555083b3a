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

use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::control::math_tool::inverse_2x2;
use crate::error::GuiderError;
use crate::utility::write_file_atomic;

/// Calibration of the image stabilization unit.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CalibrationMatrix {
    // Forward matrix from digital unit to pixel. The first row is the image
    // displacement per unit of the x-axis, and the second row is the one of
    // the y-axis.
    pub a: Matrix2<f64>,
    // Correction matrix from pixel to digital unit, the inverse of a.
    pub b: Matrix2<f64>,
}

// Flat record of the calibration file.
#[derive(Serialize, Deserialize, Debug)]
struct CalibrationRecord {
    #[serde(rename = "A11")]
    a11: f64,
    #[serde(rename = "A12")]
    a12: f64,
    #[serde(rename = "A21")]
    a21: f64,
    #[serde(rename = "A22")]
    a22: f64,
    #[serde(rename = "B11")]
    b11: f64,
    #[serde(rename = "B12")]
    b12: f64,
    #[serde(rename = "B21")]
    b21: f64,
    #[serde(rename = "B22")]
    b22: f64,
}

impl CalibrationMatrix {
    /// Create the calibration from the forward matrix.
    ///
    /// # Arguments
    /// * `a` - Forward matrix from digital unit to pixel.
    ///
    /// # Returns
    /// Calibration.
    ///
    /// # Errors
    /// If the forward matrix is singular.
    pub fn from_forward(a: Matrix2<f64>) -> Result<Self, GuiderError> {
        match inverse_2x2(&a) {
            Some(b) => Ok(Self { a: a, b: b }),
            None => Err(GuiderError::Calibration(format!(
                "forward matrix {:?} is singular",
                a.as_slice()
            ))),
        }
    }

    /// The calibration file exists or not.
    ///
    /// # Arguments
    /// * `filepath` - Path of the calibration file.
    ///
    /// # Returns
    /// True if the file exists. Otherwise, false.
    pub fn exists(filepath: &Path) -> bool {
        filepath.is_file()
    }

    /// Save the calibration. The file is replaced atomically.
    ///
    /// # Arguments
    /// * `filepath` - Path of the calibration file.
    ///
    /// # Errors
    /// If the file can not be written.
    pub fn save(&self, filepath: &Path) -> Result<(), GuiderError> {
        let record = CalibrationRecord {
            a11: self.a[(0, 0)],
            a12: self.a[(0, 1)],
            a21: self.a[(1, 0)],
            a22: self.a[(1, 1)],
            b11: self.b[(0, 0)],
            b12: self.b[(0, 1)],
            b21: self.b[(1, 0)],
            b22: self.b[(1, 1)],
        };

        let content = serde_json::to_string_pretty(&record)
            .map_err(|error| GuiderError::storage(filepath, error))?;

        write_file_atomic(filepath, content.as_bytes())
    }

    /// Load the calibration.
    ///
    /// # Arguments
    /// * `filepath` - Path of the calibration file.
    ///
    /// # Returns
    /// Calibration.
    ///
    /// # Errors
    /// If the file can not be read, or any value is missing or not finite.
    pub fn load(filepath: &Path) -> Result<Self, GuiderError> {
        let content = read_to_string(filepath).map_err(|error| GuiderError::storage(filepath, error))?;
        let record: CalibrationRecord =
            serde_json::from_str(&content).map_err(|error| GuiderError::storage(filepath, error))?;

        let a = Matrix2::new(record.a11, record.a12, record.a21, record.a22);
        let b = Matrix2::new(record.b11, record.b12, record.b21, record.b22);
        if a.iter().chain(b.iter()).any(|value| !value.is_finite()) {
            return Err(GuiderError::storage(filepath, "non-finite calibration value"));
        }

        Ok(Self { a: a, b: b })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use serde_json::Value;
    use std::fs::write;
    use tempfile::tempdir;

    use crate::constants::CALIBRATION_KEYS;

    #[test]
    fn test_from_forward() {
        let a = Matrix2::new(0.02, 0.002, 0.003, -0.025);
        let calibration = CalibrationMatrix::from_forward(a).unwrap();

        assert_eq!(calibration.a, a);
        assert_relative_eq!(calibration.a * calibration.b, Matrix2::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_from_forward_singular() {
        let result = CalibrationMatrix::from_forward(Matrix2::new(0.02, 0.01, 0.04, 0.02));

        assert!(matches!(result, Err(GuiderError::Calibration(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let filepath = dir.path().join("is_calibration.json");

        assert!(!CalibrationMatrix::exists(&filepath));

        let calibration =
            CalibrationMatrix::from_forward(Matrix2::new(0.0213, -0.0017, 0.0009, 0.0248))
                .unwrap();
        calibration.save(&filepath).unwrap();

        assert!(CalibrationMatrix::exists(&filepath));

        let calibration_loaded = CalibrationMatrix::load(&filepath).unwrap();

        assert_relative_eq!(calibration_loaded.a, calibration.a, epsilon = 1e-15);
        assert_relative_eq!(calibration_loaded.b, calibration.b, epsilon = 1e-12);
    }

    #[test]
    fn test_save_keys() {
        let dir = tempdir().unwrap();
        let filepath = dir.path().join("is_calibration.json");

        CalibrationMatrix::from_forward(Matrix2::identity())
            .unwrap()
            .save(&filepath)
            .unwrap();

        let content: Value = serde_json::from_str(&read_to_string(&filepath).unwrap()).unwrap();
        let object = content.as_object().unwrap();

        assert_eq!(object.len(), CALIBRATION_KEYS.len());
        for key in CALIBRATION_KEYS {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(content["B11"], 1.0);
        assert_eq!(content["B12"], 0.0);
    }

    #[test]
    fn test_load_error() {
        let dir = tempdir().unwrap();

        // No file
        assert!(matches!(
            CalibrationMatrix::load(&dir.path().join("missing.json")),
            Err(GuiderError::Storage { .. })
        ));

        // Missing field
        let filepath = dir.path().join("partial.json");
        write(&filepath, r#"{"A11": 1.0, "A12": 0.0}"#).unwrap();
        assert!(CalibrationMatrix::load(&filepath).is_err());
    }
}
