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

use log::{debug, error, info, warn};
use std::sync::{
    mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError},
    Arc,
};
use std::thread::{spawn, JoinHandle, ThreadId};

use crate::constants::BOUND_SYNC_CHANNEL;
use crate::control::guiding_core::GuidingCore;
use crate::enums::FailureCategory;
use crate::utility::seconds_to_duration;

pub struct GuidingProcess {
    _core: Arc<GuidingCore>,
    // Receiver of the stop request.
    _receiver_to_stop: Receiver<()>,
}

impl GuidingProcess {
    /// Create a new instance of the guiding process.
    ///
    /// # Arguments
    /// * `core` - Shared core of the guider.
    /// * `receiver_to_stop` - Receiver of the stop request.
    ///
    /// # Returns
    /// New instance of the guiding process.
    pub fn new(core: &Arc<GuidingCore>, receiver_to_stop: Receiver<()>) -> Self {
        Self {
            _core: core.clone(),
            _receiver_to_stop: receiver_to_stop,
        }
    }

    /// Run the correction cycles until the stop is requested. Any failure of
    /// a cycle is logged and the next cycle runs after the guiding interval.
    pub fn run(&mut self) {
        info!("Guiding process is running.");

        loop {
            match self._receiver_to_stop.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            match self._core.perform_correction() {
                Ok(correction) => debug!("Correction: {:?}.", correction),
                Err(error) => {
                    let category = error.category();
                    if category == FailureCategory::Algorithm {
                        warn!("Correction cycle is abandoned ({category} failure): {error}");
                    } else {
                        error!("Correction cycle is abandoned ({category} failure): {error}");
                    }
                }
            }

            // Operator may change the interval while guiding.
            let interval = self._core.state.lock().guiding_interval;
            let duration = match seconds_to_duration(interval) {
                Some(duration) => duration,
                None => {
                    error!("Guiding interval of {interval} seconds is not valid. Wait for the stop.");
                    let _ = self._receiver_to_stop.recv();
                    break;
                }
            };

            match self._receiver_to_stop.recv_timeout(duration) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        }

        info!("Guiding process is stopped.");
    }
}

/// Handle of the running guiding process.
pub struct GuidingWorker {
    // Sender of the stop request.
    _sender_to_stop: SyncSender<()>,
    _handle: JoinHandle<()>,
}

impl GuidingWorker {
    /// Spawn the guiding process in a new thread.
    ///
    /// # Arguments
    /// * `core` - Shared core of the guider.
    ///
    /// # Returns
    /// Handle of the guiding process.
    pub fn spawn(core: &Arc<GuidingCore>) -> Self {
        let (sender_to_stop, receiver_to_stop) = sync_channel(BOUND_SYNC_CHANNEL);

        let mut guiding_process = GuidingProcess::new(core, receiver_to_stop);
        let handle = spawn(move || {
            guiding_process.run();
        });

        Self {
            _sender_to_stop: sender_to_stop,
            _handle: handle,
        }
    }

    /// Thread ID of the guiding process.
    pub fn thread_id(&self) -> ThreadId {
        self._handle.thread().id()
    }

    /// Request the guiding process to stop and wait until the current cycle
    /// is done.
    pub fn stop(self) {
        // The channel is full only if a stop request is pending already.
        let _ = self._sender_to_stop.try_send(());

        if self._handle.join().is_err() {
            error!("Guiding process panicked.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::Matrix2;
    use std::path::Path;
    use std::thread::sleep;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    use crate::config::Config;
    use crate::control::calibration::CalibrationMatrix;
    use crate::image::registration::SimilarityTransform;
    use crate::mock::mock_registrar::ScriptedRegistrar;
    use crate::mock::mock_rig::MockRig;

    fn create_core(dir: &Path, camera_delay: Duration) -> (Arc<GuidingCore>, MockRig) {
        let mut config = Config::new(Path::new("config/parameters_guider.yaml")).unwrap();
        config.calibration_file = dir.join("is_calibration.json");
        config.diagnostic_dir = dir.to_path_buf();

        CalibrationMatrix::from_forward(Matrix2::identity())
            .unwrap()
            .save(&config.calibration_file)
            .unwrap();

        let rig = MockRig::from_file(Path::new("config/parameters_simulation.yaml")).unwrap();
        let hardware = rig.hardware(
            rig.camera().with_delay(camera_delay),
            rig.lens(),
            Box::new(ScriptedRegistrar::new(SimilarityTransform::from_translation(
                1.0, 0.0,
            ))),
        );

        let core = Arc::new(GuidingCore::new(config, hardware));
        core.connect().unwrap();
        core.state.lock().guiding_interval = 0.0;

        (core, rig)
    }

    #[test]
    fn test_run() {
        let dir = tempdir().unwrap();
        let (core, rig) = create_core(dir.path(), Duration::from_millis(10));
        core.take_reference_image().unwrap();

        let worker = GuidingWorker::spawn(&core);

        sleep(Duration::from_millis(300));
        worker.stop();

        // Each cycle moves the x-axis by 1 digital unit.
        let number = core.history.lock().len();
        assert!(number >= 1);
        assert_eq!(rig.plant.lens_position(), (number as i32, 0));
    }

    #[test]
    fn test_run_failed_cycle() {
        let dir = tempdir().unwrap();
        let (core, rig) = create_core(dir.path(), Duration::ZERO);

        // No reference image, so every cycle fails but the loop goes on.
        let worker = GuidingWorker::spawn(&core);

        sleep(Duration::from_millis(100));
        worker.stop();

        assert!(core.history.lock().is_empty());
        assert_eq!(rig.plant.lens_position(), (0, 0));
    }

    #[test]
    fn test_stop_in_interval() {
        let dir = tempdir().unwrap();
        let (core, _) = create_core(dir.path(), Duration::ZERO);
        core.take_reference_image().unwrap();
        core.state.lock().guiding_interval = 60.0;

        let worker = GuidingWorker::spawn(&core);
        sleep(Duration::from_millis(100));

        // The stop does not wait for the end of the interval.
        let now = Instant::now();
        worker.stop();

        assert!(now.elapsed() < Duration::from_secs(10));
        assert_eq!(core.history.lock().len(), 1);
    }

    #[test]
    fn test_run_invalid_interval() {
        let dir = tempdir().unwrap();
        let (core, _) = create_core(dir.path(), Duration::ZERO);
        core.take_reference_image().unwrap();
        core.state.lock().guiding_interval = 1e20;

        let worker = GuidingWorker::spawn(&core);
        sleep(Duration::from_millis(100));

        // The process waits for the stop instead of panicking.
        assert!(!worker._handle.is_finished());

        let now = Instant::now();
        worker.stop();

        assert!(now.elapsed() < Duration::from_secs(10));
        assert_eq!(core.history.lock().len(), 1);
    }
}
