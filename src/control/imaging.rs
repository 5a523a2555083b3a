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

use log::debug;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::RegistrationTolerance;
use crate::constants::HOME_POSITION;
use crate::error::{DeviceError, GuiderError};
use crate::hardware::camera::ExposureRequest;
use crate::hardware::rig::GuiderHardware;
use crate::image::difference::diff;
use crate::image::registration::SimilarityTransform;
use crate::image::trim::trim_to_registration_region;

/// Take an exposure and wait for the image. The exposure is a failure if it
/// does not complete within the timeout of the request.
///
/// # Arguments
/// * `hardware` - Collaborators of the guider.
/// * `request` - Exposure request.
///
/// # Returns
/// Path of the image.
///
/// # Errors
/// GuiderError::Imaging if the camera fails or the deadline is exceeded.
pub fn take_exposure(
    hardware: &mut GuiderHardware,
    request: &ExposureRequest,
) -> Result<PathBuf, GuiderError> {
    debug!(
        "Taking {} exposure of {:?}.",
        request.kind.as_ref().to_lowercase(),
        request.exposure_time
    );

    let now = Instant::now();
    let path = hardware
        .camera
        .expose(request)
        .map_err(GuiderError::Imaging)?;

    if now.elapsed() > request.timeout {
        return Err(GuiderError::Imaging(DeviceError::Timeout(request.timeout)));
    }

    debug!("Exposure saved to {:?}.", path);

    Ok(path)
}

/// Register the source image to the target image. Both images are trimmed to
/// the illuminated region first.
///
/// # Arguments
/// * `hardware` - Collaborators of the guider.
/// * `source` - Path of the source image.
/// * `target` - Path of the target image.
/// * `tolerance` - Registration tolerance.
///
/// # Returns
/// Similarity transform that maps the source image onto the target image.
///
/// # Errors
/// If any image can not be read, there is no match, or the match is not
/// trustworthy.
pub fn register_images(
    hardware: &GuiderHardware,
    source: &Path,
    target: &Path,
    tolerance: &RegistrationTolerance,
) -> Result<SimilarityTransform, GuiderError> {
    let frame_source = trim_to_registration_region(&hardware.store.load(source)?)?;
    let frame_target = trim_to_registration_region(&hardware.store.load(target)?)?;

    let transform = hardware.registrar.register(&frame_source, &frame_target)?;
    debug!(
        "Translation: {:?}, rotation: {}, scale: {}.",
        transform.translation, transform.rotation, transform.scale
    );

    transform.check_quality(tolerance)?;

    Ok(transform)
}

/// Save the difference image (image - reference) to the diagnostic storage.
///
/// # Arguments
/// * `hardware` - Collaborators of the guider.
/// * `reference` - Path of the reference image.
/// * `image` - Path of the image.
/// * `output` - Path of the difference image.
///
/// # Errors
/// If any image can not be read or written, or the dimensions differ.
pub fn save_difference_image(
    hardware: &GuiderHardware,
    reference: &Path,
    image: &Path,
    output: &Path,
) -> Result<(), GuiderError> {
    let frame_reference = hardware.store.load(reference)?;
    let frame_image = hardware.store.load(image)?;

    hardware
        .diagnostic_store
        .save(output, &diff(&frame_reference, &frame_image)?)
}

/// Move the image stabilization unit to the home position.
///
/// # Arguments
/// * `hardware` - Collaborators of the guider.
///
/// # Errors
/// GuiderError::Actuator if the lens fails.
pub fn home(hardware: &mut GuiderHardware) -> Result<(), GuiderError> {
    debug!("Homing the image stabilization unit.");

    hardware
        .lens
        .move_to(HOME_POSITION.0, HOME_POSITION.1)
        .map_err(GuiderError::Actuator)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    use crate::image::frame::{Frame, ImageStore, JsonFrameStore};
    use crate::mock::mock_image_store::MockImageStore;
    use crate::mock::mock_registrar::ScriptedRegistrar;
    use crate::mock::mock_rig::MockRig;

    fn create_hardware(rig: &MockRig) -> GuiderHardware {
        rig.hardware(
            rig.camera(),
            rig.lens(),
            Box::new(ScriptedRegistrar::new(SimilarityTransform::from_translation(
                0.0, 0.0,
            ))),
        )
    }

    fn create_rig(reference: &Path, image: &Path) -> MockRig {
        let rig = MockRig::from_file(Path::new("config/parameters_simulation.yaml")).unwrap();

        rig.store
            .save(reference, &Frame::from_element(4, 3, 1.0))
            .unwrap();
        rig.store
            .save(image, &Frame::from_element(4, 3, 3.5))
            .unwrap();

        rig
    }

    #[test]
    fn test_save_difference_image() {
        let dir = tempdir().unwrap();
        let reference = dir.path().join("reference.json");
        let image = dir.path().join("image.json");

        let rig = create_rig(&reference, &image);
        let hardware = create_hardware(&rig);

        let output = dir.path().join("difference.json");
        save_difference_image(&hardware, &reference, &image, &output).unwrap();

        // The difference image is on the file system only.
        assert!(!rig.store.exists(&output));
        assert_eq!(
            JsonFrameStore.load(&output).unwrap(),
            Frame::from_element(4, 3, 2.5)
        );
    }

    #[test]
    fn test_save_difference_image_diagnostic_store() {
        let reference = Path::new("/tmp/reference.json");
        let image = Path::new("/tmp/image.json");

        let rig = create_rig(reference, image);
        let diagnostic_store = MockImageStore::new();
        let hardware =
            create_hardware(&rig).with_diagnostic_store(Box::new(diagnostic_store.clone()));

        let output = Path::new("/tmp/difference.json");
        save_difference_image(&hardware, reference, image, output).unwrap();

        assert_eq!(diagnostic_store.len(), 1);
        assert_eq!(diagnostic_store.load(output).unwrap()[(3, 2)], 2.5);

        // Dimension mismatch
        rig.store
            .save(image, &Frame::from_element(2, 3, 3.5))
            .unwrap();

        assert!(matches!(
            save_difference_image(&hardware, reference, image, output),
            Err(GuiderError::ImageFormat(_))
        ));
    }
}
