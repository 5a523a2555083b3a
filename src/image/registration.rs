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

use serde::{Deserialize, Serialize};

use crate::config::RegistrationTolerance;
use crate::error::GuiderError;
use crate::image::frame::Frame;

/// Two-dimensional similarity transform: translation, rotation, and uniform
/// scale.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct SimilarityTransform {
    // Translation (dx, dy) in pixel.
    pub translation: (f64, f64),
    // Rotation in radian.
    pub rotation: f64,
    // Scale.
    pub scale: f64,
}

impl SimilarityTransform {
    /// Create a pure translation.
    ///
    /// # Arguments
    /// * `dx` - Translation in x in pixel.
    /// * `dy` - Translation in y in pixel.
    ///
    /// # Returns
    /// A new transform without rotation and with the unit scale.
    pub fn from_translation(dx: f64, dy: f64) -> Self {
        Self {
            translation: (dx, dy),
            rotation: 0.0,
            scale: 1.0,
        }
    }

    /// Check the transform is close enough to a pure translation to be
    /// trusted.
    ///
    /// # Arguments
    /// * `tolerance` - Registration tolerance.
    ///
    /// # Errors
    /// GuiderError::Registration if the translation is not finite.
    /// GuiderError::RegistrationQuality if the scale or rotation is out of
    /// the tolerance.
    pub fn check_quality(&self, tolerance: &RegistrationTolerance) -> Result<(), GuiderError> {
        let (dx, dy) = self.translation;
        if !(dx.is_finite() && dy.is_finite()) {
            return Err(GuiderError::Registration(format!(
                "non-finite translation ({dx}, {dy})"
            )));
        }

        if ((self.scale - 1.0).abs() < tolerance.max_scale_deviation)
            && (self.rotation.abs() < tolerance.max_rotation)
        {
            return Ok(());
        }

        Err(GuiderError::RegistrationQuality {
            scale: self.scale,
            rotation: self.rotation,
        })
    }
}

/// Image registration. This finds the similarity transform that maps the
/// source image onto the target image.
pub trait ImageRegistrar {
    /// Register the source image to the target image.
    ///
    /// # Arguments
    /// * `source` - Source image.
    /// * `target` - Target image.
    ///
    /// # Returns
    /// Similarity transform. The translation is the displacement that moves
    /// the source image onto the target image.
    ///
    /// # Errors
    /// GuiderError::Registration if there is no reliable match.
    fn register(&self, source: &Frame, target: &Frame)
        -> Result<SimilarityTransform, GuiderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_tolerance() -> RegistrationTolerance {
        RegistrationTolerance {
            max_scale_deviation: 0.01,
            max_rotation: 0.01,
        }
    }

    #[test]
    fn test_from_translation() {
        let transform = SimilarityTransform::from_translation(1.5, -2.0);

        assert_eq!(transform.translation, (1.5, -2.0));
        assert_eq!(transform.rotation, 0.0);
        assert_eq!(transform.scale, 1.0);
    }

    #[test]
    fn test_check_quality() {
        let tolerance = create_tolerance();

        assert!(SimilarityTransform::from_translation(100.0, 3.0)
            .check_quality(&tolerance)
            .is_ok());

        let mut transform = SimilarityTransform::from_translation(0.0, 0.0);
        transform.scale = 1.005;
        transform.rotation = -0.005;
        assert!(transform.check_quality(&tolerance).is_ok());
    }

    #[test]
    fn test_check_quality_error() {
        let tolerance = create_tolerance();

        let mut transform = SimilarityTransform::from_translation(0.0, 0.0);
        transform.scale = 1.5;
        assert!(matches!(
            transform.check_quality(&tolerance),
            Err(GuiderError::RegistrationQuality { scale, .. }) if scale == 1.5
        ));

        let mut transform = SimilarityTransform::from_translation(0.0, 0.0);
        transform.rotation = 0.02;
        assert!(transform.check_quality(&tolerance).is_err());

        let mut transform = SimilarityTransform::from_translation(f64::NAN, 0.0);
        transform.scale = f64::NAN;
        assert!(transform.check_quality(&tolerance).is_err());

        let transform = SimilarityTransform::from_translation(0.0, f64::INFINITY);
        assert!(matches!(
            transform.check_quality(&tolerance),
            Err(GuiderError::Registration(_))
        ));
    }
}
