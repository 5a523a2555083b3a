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

use crate::hardware::camera::ImagingDevice;
use crate::hardware::lens::StabilizationActuator;
use crate::image::frame::{ImageStore, JsonFrameStore};
use crate::image::registration::ImageRegistrar;

/// Collaborators of the guider. The guider keeps them behind a single lock so
/// that only one hardware activity happens at a time.
pub struct GuiderHardware {
    // Guide camera.
    pub camera: Box<dyn ImagingDevice + Send>,
    // Image stabilization unit of the lens.
    pub lens: Box<dyn StabilizationActuator + Send>,
    // Image registration.
    pub registrar: Box<dyn ImageRegistrar + Send>,
    // Storage of the images.
    pub store: Box<dyn ImageStore + Send>,
    // Storage of the difference images for the diagnosis.
    pub diagnostic_store: Box<dyn ImageStore + Send>,
}

impl GuiderHardware {
    /// Create the collaborators of the guider.
    ///
    /// # Arguments
    /// * `camera` - Guide camera.
    /// * `lens` - Image stabilization unit.
    /// * `registrar` - Image registration.
    /// * `store` - Storage of the images.
    ///
    /// # Returns
    /// Collaborators of the guider. The difference images are written to the
    /// file system.
    pub fn new(
        camera: Box<dyn ImagingDevice + Send>,
        lens: Box<dyn StabilizationActuator + Send>,
        registrar: Box<dyn ImageRegistrar + Send>,
        store: Box<dyn ImageStore + Send>,
    ) -> Self {
        Self {
            camera: camera,
            lens: lens,
            registrar: registrar,
            store: store,
            diagnostic_store: Box::new(JsonFrameStore),
        }
    }

    /// Set the storage of the difference images.
    pub fn with_diagnostic_store(mut self, store: Box<dyn ImageStore + Send>) -> Self {
        self.diagnostic_store = store;
        self
    }
}
