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

use crate::error::GuiderError;
use crate::image::frame::Frame;
use crate::image::registration::{ImageRegistrar, SimilarityTransform};
use crate::mock::mock_constants::{CENTROID_THRESHOLD, MIN_STAR_CONTRAST};

/// Registration by the centroid of the brightest star. This only finds the
/// translation, the rotation is 0 and the scale is 1.
pub struct CentroidRegistrar;

impl CentroidRegistrar {
    /// Calculate the centroid of the star.
    ///
    /// # Arguments
    /// * `frame` - Image.
    ///
    /// # Returns
    /// Centroid (x, y) in pixel.
    ///
    /// # Errors
    /// If there is no star in the frame.
    fn centroid(frame: &Frame) -> Result<(f64, f64), GuiderError> {
        let minimum = frame.iter().fold(f32::INFINITY, |acc, &value| acc.min(value));
        let maximum = frame
            .iter()
            .fold(f32::NEG_INFINITY, |acc, &value| acc.max(value));

        if !(maximum - minimum >= MIN_STAR_CONTRAST) {
            return Err(GuiderError::Registration(String::from(
                "no star in the frame",
            )));
        }

        let threshold = minimum + CENTROID_THRESHOLD * (maximum - minimum);

        let mut sum_weight = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for column in 0..frame.ncols() {
            for row in 0..frame.nrows() {
                let weight = (frame[(row, column)] - threshold) as f64;
                if weight > 0.0 {
                    sum_weight += weight;
                    sum_x += weight * (column as f64);
                    sum_y += weight * (row as f64);
                }
            }
        }

        Ok((sum_x / sum_weight, sum_y / sum_weight))
    }
}

impl ImageRegistrar for CentroidRegistrar {
    fn register(
        &self,
        source: &Frame,
        target: &Frame,
    ) -> Result<SimilarityTransform, GuiderError> {
        if source.shape() != target.shape() {
            return Err(GuiderError::ImageFormat(format!(
                "source is {:?} but target is {:?}",
                source.shape(),
                target.shape()
            )));
        }

        let (x_source, y_source) = Self::centroid(source)?;
        let (x_target, y_target) = Self::centroid(target)?;

        Ok(SimilarityTransform::from_translation(
            x_target - x_source,
            y_target - y_source,
        ))
    }
}

/// Registration that returns a fixed result.
pub struct ScriptedRegistrar {
    _transform: Option<SimilarityTransform>,
}

impl ScriptedRegistrar {
    /// Registration that always returns the transform.
    pub fn new(transform: SimilarityTransform) -> Self {
        Self {
            _transform: Some(transform),
        }
    }

    /// Registration that never finds a match.
    pub fn no_match() -> Self {
        Self { _transform: None }
    }
}

impl ImageRegistrar for ScriptedRegistrar {
    fn register(&self, _source: &Frame, _target: &Frame) -> Result<SimilarityTransform, GuiderError> {
        self._transform
            .ok_or_else(|| GuiderError::Registration(String::from("no match")))
    }
}
