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

use crate::constants::MIN_FRAME_ROWS;
use crate::error::GuiderError;
use crate::image::frame::Frame;

/// Trim the raw frame to the region used by the registration. Only the lower
/// half of the guide sensor is illuminated. The first row is dropped as well.
///
/// # Arguments
/// * `frame` - Raw frame.
///
/// # Returns
/// Trimmed frame with the rows [1, rows / 2).
///
/// # Errors
/// If the frame has too few rows to be trimmed.
pub fn trim_to_registration_region(frame: &Frame) -> Result<Frame, GuiderError> {
    let rows = frame.nrows();
    if (rows < MIN_FRAME_ROWS) || (frame.ncols() == 0) {
        return Err(GuiderError::ImageFormat(format!(
            "can not trim a {} x {} frame",
            rows,
            frame.ncols()
        )));
    }

    let start = 1;
    let end = rows / 2;

    Ok(frame.rows(start, end - start).clone_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_to_registration_region() {
        let frame = Frame::from_fn(10, 3, |row, _| row as f32);

        let trimmed = trim_to_registration_region(&frame).unwrap();

        assert_eq!(trimmed.shape(), (4, 3));
        assert_eq!(trimmed[(0, 0)], 1.0);
        assert_eq!(trimmed[(3, 2)], 4.0);
    }

    #[test]
    fn test_trim_to_registration_region_odd() {
        let frame = Frame::from_fn(9, 2, |row, _| row as f32);

        let trimmed = trim_to_registration_region(&frame).unwrap();

        assert_eq!(trimmed.nrows(), 3);
        assert_eq!(trimmed[(2, 1)], 3.0);
    }

    #[test]
    fn test_trim_to_registration_region_error() {
        assert!(trim_to_registration_region(&Frame::zeros(3, 10)).is_err());
        assert!(trim_to_registration_region(&Frame::zeros(10, 0)).is_err());
    }
}
