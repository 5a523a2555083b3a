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

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::enums::FailureCategory;

/// Failure reported by a hardware collaborator (camera or image stabilization
/// unit). The guider propagates it without interpretation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device is not connected")]
    NotConnected,
    #[error("communication failed: {0}")]
    Communication(String),
    #[error("operation did not complete within {0:?}")]
    Timeout(Duration),
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Errors of the active optics guider.
#[derive(Error, Debug)]
pub enum GuiderError {
    #[error("Active optics system is not connected. Connect it first.")]
    NotConnected,
    #[error("Active optics system is not calibrated. Run the calibration first.")]
    NotCalibrated,
    #[error("Could not find the reference image: {0}.")]
    NoReferenceImage(String),
    #[error("Image registration failed: {0}.")]
    Registration(String),
    #[error("Image registration is not trustworthy (scale: {scale}, rotation: {rotation} rad).")]
    RegistrationQuality { scale: f64, rotation: f64 },
    #[error("Calibration failed: {0}.")]
    Calibration(String),
    #[error("Image stabilization unit failed: {0}.")]
    Actuator(#[source] DeviceError),
    #[error("Guide camera failed: {0}.")]
    Imaging(#[source] DeviceError),
    #[error("Bad image format: {0}.")]
    ImageFormat(String),
    #[error("Storage of {path:?} failed: {message}.")]
    Storage { path: PathBuf, message: String },
    #[error("Bad configuration: {0}.")]
    Config(String),
    #[error("Invalid parameter: {0}.")]
    InvalidParameter(String),
    #[error("Guiding is in progress. Stop guiding first.")]
    GuidingInProgress,
}

impl GuiderError {
    /// Create a storage error.
    ///
    /// # Arguments
    /// * `path` - Path of the file.
    /// * `error` - Underlying error.
    ///
    /// # Returns
    /// Storage error.
    pub fn storage(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        GuiderError::Storage {
            path: path.into(),
            message: error.to_string(),
        }
    }

    /// Category of the failure.
    ///
    /// # Returns
    /// Category of the failure.
    pub fn category(&self) -> FailureCategory {
        match self {
            GuiderError::Actuator(_) | GuiderError::Imaging(_) | GuiderError::Storage { .. } => {
                FailureCategory::Hardware
            }
            GuiderError::Registration(_)
            | GuiderError::RegistrationQuality { .. }
            | GuiderError::Calibration(_)
            | GuiderError::ImageFormat(_) => FailureCategory::Algorithm,
            GuiderError::NotConnected
            | GuiderError::NotCalibrated
            | GuiderError::NoReferenceImage(_)
            | GuiderError::Config(_)
            | GuiderError::InvalidParameter(_)
            | GuiderError::GuidingInProgress => FailureCategory::Precondition,
        }
    }

    /// The next correction cycle may succeed without any intervention or not.
    ///
    /// # Returns
    /// True if the failure is only related to the current frame.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GuiderError::Registration(_)
                | GuiderError::RegistrationQuality { .. }
                | GuiderError::ImageFormat(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category() {
        assert_eq!(
            GuiderError::Imaging(DeviceError::NotConnected).category(),
            FailureCategory::Hardware
        );
        assert_eq!(
            GuiderError::Registration(String::from("no match")).category(),
            FailureCategory::Algorithm
        );
        assert_eq!(
            GuiderError::NotCalibrated.category(),
            FailureCategory::Precondition
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(GuiderError::RegistrationQuality {
            scale: 1.5,
            rotation: 0.0
        }
        .is_retryable());

        assert!(!GuiderError::NotCalibrated.is_retryable());
        assert!(!GuiderError::Actuator(DeviceError::Timeout(Duration::from_secs(1))).is_retryable());
    }

    #[test]
    fn test_message() {
        assert_eq!(
            GuiderError::Actuator(DeviceError::Communication(String::from("no reply")))
                .to_string(),
            "Image stabilization unit failed: communication failed: no reply."
        );

        assert_eq!(
            GuiderError::storage("/tmp/a.json", "disk full").to_string(),
            "Storage of \"/tmp/a.json\" failed: disk full."
        );
    }
}
