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

use log::{info, warn};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag::register,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::constants::{PERIOD_CHECK_STOP, SIMULATION_CONFIG_FILE};
use crate::control::guider::ActiveOpticsGuider;
use crate::error::GuiderError;
use crate::mock::mock_registrar::CentroidRegistrar;
use crate::mock::mock_rig::MockRig;

/// Run the active optics guider until the termination signal or the end of
/// the duration.
///
/// # Arguments
/// * `config_file` - Path of the guider parameters file.
/// * `is_simulation_mode` - Is the simulation mode or not.
/// * `is_calibration` - Calibrate before the guiding or not.
/// * `shift` - Shift of the calibration in digital unit. If None, the value
/// in the configuration is used.
/// * `duration` - Duration of the guiding. If None, guide until the
/// termination signal.
///
/// # Errors
/// If the configuration is invalid, the hardware mode is requested, or the
/// guider can not connect, calibrate, or start.
pub fn run(
    config_file: &Path,
    is_simulation_mode: bool,
    is_calibration: bool,
    shift: Option<i32>,
    duration: Option<Duration>,
) -> Result<(), GuiderError> {
    // Log the running mode
    let mode = if is_simulation_mode {
        "simulation mode"
    } else {
        "hardware mode"
    };
    info!("Run the active optics guider in {mode}.");

    if !is_simulation_mode {
        return Err(GuiderError::Config(String::from(
            "hardware mode has no device driver, use the simulation mode",
        )));
    }

    let config = Config::new(config_file)?;
    let shift = shift.unwrap_or(config.calibration_shift);

    let rig = MockRig::from_file(Path::new(SIMULATION_CONFIG_FILE))?;
    let hardware = rig.hardware(rig.camera(), rig.lens(), Box::new(CentroidRegistrar));

    let mut guider = ActiveOpticsGuider::new(config, hardware);

    // Register the signals that stop the application
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT].iter() {
        if let Err(error) = register(*signal, stop.clone()) {
            warn!("Failed to register the signal {signal}: {error}.");
        }
    }

    guider.connect()?;

    if is_calibration {
        guider.calibrate(shift)?;
    }

    guider.start_guiding()?;

    // Run the main loop
    let now = Instant::now();
    while !stop.load(Ordering::Relaxed) && duration.map_or(true, |time| now.elapsed() < time) {
        sleep(PERIOD_CHECK_STOP);
    }

    info!("Stopping the active optics guider...");
    guider.stop_guiding();

    let history = guider.correction_history();
    if let Some((rms_x, rms_y)) = history.rms() {
        info!(
            "{} corrections with the RMS of ({rms_x:.3}, {rms_y:.3}) pixel.",
            history.len()
        );

        guider.save_correction_history(None)?;
    }

    guider.disconnect();
    info!("Active optics guider is stopped.");

    Ok(())
}
