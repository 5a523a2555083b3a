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

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use crate::error::DeviceError;
use crate::hardware::camera::{ExposureRequest, ImagingDevice};
use crate::image::frame::ImageStore;
use crate::mock::mock_constants::CAMERA_OUTPUT_DIR;
use crate::mock::mock_image_store::MockImageStore;
use crate::mock::mock_plant::MockPlant;

/// Simulated guide camera. The exposures are rendered by the plant and saved
/// to the image store.
pub struct MockCamera {
    _plant: MockPlant,
    _store: MockImageStore,
    // Directory of the generated filenames.
    _output_dir: PathBuf,
    _is_connected: bool,
    _number_of_exposures: usize,
    _latest_image: Option<PathBuf>,
    // Paths used by the next exposures that have no filename.
    _scripted_paths: VecDeque<PathBuf>,
    // Time to wait in each exposure.
    _delay: Duration,
}

impl MockCamera {
    /// Create a new camera. The delay of each exposure is the readout time of
    /// the plant.
    ///
    /// # Arguments
    /// * `plant` - Simulated telescope.
    /// * `store` - Image storage.
    ///
    /// # Returns
    /// New camera.
    pub fn new(plant: &MockPlant, store: &MockImageStore) -> Self {
        Self {
            _plant: plant.clone(),
            _store: store.clone(),
            _output_dir: PathBuf::from(CAMERA_OUTPUT_DIR),
            _is_connected: false,
            _number_of_exposures: 0,
            _latest_image: None,
            _scripted_paths: VecDeque::new(),
            _delay: plant.readout_time(),
        }
    }

    /// Set the delay of each exposure.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self._delay = delay;
        self
    }

    /// Set the paths of the next exposures.
    pub fn with_scripted_paths(mut self, paths: &[&str]) -> Self {
        self._scripted_paths = paths.iter().map(PathBuf::from).collect();
        self
    }

    /// Number of the exposures.
    pub fn number_of_exposures(&self) -> usize {
        self._number_of_exposures
    }

    /// Get the path of the next exposure.
    ///
    /// # Arguments
    /// * `filename` - Requested filename.
    ///
    /// # Returns
    /// Path of the next exposure.
    fn next_path(&mut self, filename: Option<&Path>) -> PathBuf {
        if let Some(filename) = filename {
            return filename.to_path_buf();
        }

        match self._scripted_paths.pop_front() {
            Some(path) => path,
            None => self
                ._output_dir
                .join(format!("image_{:05}.json", self._number_of_exposures)),
        }
    }
}

impl ImagingDevice for MockCamera {
    fn is_connected(&self) -> bool {
        self._is_connected
    }

    fn connect(&mut self) -> Result<(), DeviceError> {
        self._is_connected = true;

        Ok(())
    }

    fn expose(&mut self, request: &ExposureRequest) -> Result<PathBuf, DeviceError> {
        if !self._is_connected {
            return Err(DeviceError::NotConnected);
        }

        if self._delay > request.timeout {
            sleep(request.timeout);
            return Err(DeviceError::Timeout(request.timeout));
        }
        sleep(self._delay);

        let frame = self
            ._plant
            .expose(request.exposure_time.as_secs_f64(), request.binning);

        let path = self.next_path(request.filename.as_deref());
        self._store
            .save(&path, &frame)
            .map_err(|error| DeviceError::Communication(error.to_string()))?;

        self._number_of_exposures += 1;
        self._latest_image = Some(path.clone());

        Ok(path)
    }

    fn latest_image(&self) -> Option<PathBuf> {
        self._latest_image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::enums::ImageKind;
    use crate::mock::mock_plant::SimulationConfig;

    fn create_mock_camera() -> (MockCamera, MockImageStore) {
        let plant = MockPlant::new(
            SimulationConfig::new(Path::new("config/parameters_simulation.yaml")).unwrap(),
        );
        let store = MockImageStore::new();

        (
            MockCamera::new(&plant, &store).with_delay(Duration::ZERO),
            store,
        )
    }

    fn create_request(filename: Option<&Path>) -> ExposureRequest {
        ExposureRequest::new(
            1.0,
            ImageKind::Light,
            filename,
            1,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_expose() {
        let (mut camera, store) = create_mock_camera();

        // Not connected
        assert_eq!(
            camera.expose(&create_request(None)),
            Err(DeviceError::NotConnected)
        );

        camera.connect().unwrap();
        assert!(camera.latest_image().is_none());

        let path = camera.expose(&create_request(None)).unwrap();

        assert_eq!(path, Path::new(CAMERA_OUTPUT_DIR).join("image_00000.json"));
        assert_eq!(camera.latest_image(), Some(path.clone()));
        assert!(store.exists(&path));

        let path = camera
            .expose(&create_request(Some(Path::new("/tmp/a.json"))))
            .unwrap();

        assert_eq!(path, PathBuf::from("/tmp/a.json"));
        assert_eq!(camera.number_of_exposures(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_expose_scripted_paths() {
        let (camera, _) = create_mock_camera();
        let mut camera = camera.with_scripted_paths(&["/tmp/ref.fits"]);
        camera.connect().unwrap();

        assert_eq!(
            camera.expose(&create_request(None)).unwrap(),
            PathBuf::from("/tmp/ref.fits")
        );
        assert_eq!(
            camera.expose(&create_request(None)).unwrap(),
            Path::new(CAMERA_OUTPUT_DIR).join("image_00001.json")
        );
    }

    #[test]
    fn test_expose_timeout() {
        let (camera, store) = create_mock_camera();
        let mut camera = camera.with_delay(Duration::from_millis(50));
        camera.connect().unwrap();

        let mut request = create_request(None);
        request.timeout = Duration::from_millis(10);

        assert_eq!(
            camera.expose(&request),
            Err(DeviceError::Timeout(Duration::from_millis(10)))
        );
        assert!(store.is_empty());
    }
}
