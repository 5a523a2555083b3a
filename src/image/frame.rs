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

use nalgebra::DMatrix;
use std::fs::read;
use std::path::Path;

use crate::error::GuiderError;
use crate::utility::write_file_atomic;

/// Image data. The row is the y-axis and the column is the x-axis.
pub type Frame = DMatrix<f32>;

/// Storage of the frames. The camera writes the exposures to the storage and
/// the guider reads them back by path.
pub trait ImageStore {
    /// Load the frame.
    ///
    /// # Arguments
    /// * `path` - Path of the frame.
    ///
    /// # Returns
    /// Frame.
    ///
    /// # Errors
    /// If the frame does not exist or can not be decoded.
    fn load(&self, path: &Path) -> Result<Frame, GuiderError>;

    /// Save the frame.
    ///
    /// # Arguments
    /// * `path` - Path of the frame.
    /// * `frame` - Frame to save.
    ///
    /// # Errors
    /// If the frame can not be written.
    fn save(&self, path: &Path, frame: &Frame) -> Result<(), GuiderError>;

    /// The frame exists or not.
    ///
    /// # Arguments
    /// * `path` - Path of the frame.
    ///
    /// # Returns
    /// True if the frame exists. Otherwise, false.
    fn exists(&self, path: &Path) -> bool;
}

/// Frame storage on the file system. Each frame is a JSON document.
pub struct JsonFrameStore;

impl ImageStore for JsonFrameStore {
    fn load(&self, path: &Path) -> Result<Frame, GuiderError> {
        let content = read(path).map_err(|error| GuiderError::storage(path, error))?;

        serde_json::from_slice(&content)
            .map_err(|error| GuiderError::ImageFormat(format!("{:?}: {error}", path)))
    }

    fn save(&self, path: &Path, frame: &Frame) -> Result<(), GuiderError> {
        let content = serde_json::to_vec(frame)
            .map_err(|error| GuiderError::ImageFormat(format!("{:?}: {error}", path)))?;

        write_file_atomic(path, &content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::write;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.json");

        let store = JsonFrameStore;
        assert!(!store.exists(&path));

        let frame = Frame::from_fn(3, 4, |row, column| (row * 10 + column) as f32);
        store.save(&path, &frame).unwrap();

        assert!(store.exists(&path));

        let frame_loaded = store.load(&path).unwrap();
        assert_eq!(frame_loaded.shape(), (3, 4));
        assert_eq!(frame_loaded[(2, 3)], 23.0);
    }

    #[test]
    fn test_load_error() {
        let dir = tempdir().unwrap();
        let store = JsonFrameStore;

        assert!(matches!(
            store.load(&dir.path().join("missing.json")),
            Err(GuiderError::Storage { .. })
        ));

        let path = dir.path().join("broken.json");
        write(&path, "not a frame").unwrap();

        assert!(matches!(
            store.load(&path),
            Err(GuiderError::ImageFormat(_))
        ));
    }
}
