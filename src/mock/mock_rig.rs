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

use std::path::Path;

use crate::error::GuiderError;
use crate::hardware::rig::GuiderHardware;
use crate::image::registration::ImageRegistrar;
use crate::mock::mock_camera::MockCamera;
use crate::mock::mock_image_store::MockImageStore;
use crate::mock::mock_lens::MockLens;
use crate::mock::mock_plant::{MockPlant, SimulationConfig};

/// Simulated rig: the telescope and the image storage shared by the mock
/// camera and lens.
pub struct MockRig {
    pub plant: MockPlant,
    pub store: MockImageStore,
}

impl MockRig {
    /// Create a new rig.
    ///
    /// # Arguments
    /// * `config` - Simulation parameters.
    ///
    /// # Returns
    /// New rig.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            plant: MockPlant::new(config),
            store: MockImageStore::new(),
        }
    }

    /// Create a new rig from the simulation parameters file.
    ///
    /// # Arguments
    /// * `filepath` - Path of the simulation parameters file.
    ///
    /// # Returns
    /// New rig.
    ///
    /// # Errors
    /// If the file can not be read.
    pub fn from_file(filepath: &Path) -> Result<Self, GuiderError> {
        Ok(Self::new(SimulationConfig::new(filepath)?))
    }

    /// Create a camera of the rig.
    pub fn camera(&self) -> MockCamera {
        MockCamera::new(&self.plant, &self.store)
    }

    /// Create a lens of the rig.
    pub fn lens(&self) -> MockLens {
        MockLens::new(&self.plant)
    }

    /// Assemble the collaborators of the guider.
    ///
    /// # Arguments
    /// * `camera` - Camera of the rig.
    /// * `lens` - Lens of the rig.
    /// * `registrar` - Image registration.
    ///
    /// # Returns
    /// Collaborators of the guider.
    pub fn hardware(
        &self,
        camera: MockCamera,
        lens: MockLens,
        registrar: Box<dyn ImageRegistrar + Send>,
    ) -> GuiderHardware {
        GuiderHardware::new(
            Box::new(camera),
            Box::new(lens),
            registrar,
            Box::new(self.store.clone()),
        )
    }
}
