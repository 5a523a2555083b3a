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

/// Create the difference image (image_b - image_a). There is no further
/// processing of the result.
///
/// # Arguments
/// * `image_a` - First image.
/// * `image_b` - Second image.
///
/// # Returns
/// Difference image.
///
/// # Errors
/// If the dimensions of the images are different.
pub fn diff(image_a: &Frame, image_b: &Frame) -> Result<Frame, GuiderError> {
    if image_a.shape() != image_b.shape() {
        return Err(GuiderError::ImageFormat(format!(
            "dimensions differ: {:?} vs. {:?}",
            image_a.shape(),
            image_b.shape()
        )));
    }

    Ok(image_b - image_a)
}
