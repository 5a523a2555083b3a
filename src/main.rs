use clap::{value_parser, Arg, ArgAction, Command};
use log::{error, info};
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger,
    TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::Path;
use std::process::exit;

use run_ao_guider::application;
use run_ao_guider::utility::seconds_to_duration;

fn main() {
    // Parse the command line arguments
    let matches = Command::new("active optics guider")
        .about("Active optics guider of the image stabilization lens.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Guider parameters file")
                .default_value("config/parameters_guider.yaml"),
        )
        .arg(
            Arg::new("simulate")
                .short('s')
                .long("simulate")
                .action(ArgAction::SetTrue)
                .help("Run the simulation mode"),
        )
        .arg(
            Arg::new("calibrate")
                .long("calibrate")
                .action(ArgAction::SetTrue)
                .help("Calibrate the image stabilization unit before guiding"),
        )
        .arg(
            Arg::new("shift")
                .long("shift")
                .help("Shift of the calibration in digital units. Default is the value in the configuration file.")
                .value_parser(value_parser!(i32)),
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .help("Duration of the guiding in second. Default is to guide until SIGINT or SIGTERM.")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("log-level")
                .help("Log level: 0 (Off), 1 (Error), 2 (Warn), 3 (Info), 4 (Debug), 5 (Trace)")
                .default_value("3")
                .value_parser(value_parser!(u32)),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map_or("config/parameters_guider.yaml", String::as_str);

    // Check the simulation mode
    let is_simulation_mode = matches.get_flag("simulate");
    let is_calibration = matches.get_flag("calibrate");

    let shift = matches.get_one::<i32>("shift").copied();
    let duration_seconds = matches.get_one::<f64>("duration").copied();

    // Check the log filter
    let log_filter = get_log_filter(matches.get_one::<u32>("level"));

    // Initiate the logger
    initiate_logger(log_filter, "application.log");
    info!("Log level: {log_filter}.");

    let duration = match duration_seconds {
        Some(seconds) => match seconds_to_duration(seconds) {
            Some(duration) => Some(duration),
            None => {
                error!("Duration of {seconds} seconds is not valid.");
                exit(1);
            }
        },
        None => None,
    };

    // Run the application
    if let Err(error) = application::run(
        Path::new(config_file),
        is_simulation_mode,
        is_calibration,
        shift,
        duration,
    ) {
        error!("Active optics guider failed ({} failure): {error}", error.category());
        exit(1);
    }
}

/// Get the log filter.
///
/// # Arguments
/// * `log_level` - Log level.
///
/// # Returns
/// Log filter.
fn get_log_filter(log_level: Option<&u32>) -> LevelFilter {
    match log_level {
        Some(level) => match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5 => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        None => LevelFilter::Info,
    }
}

/// Initiate the logger.
///
/// # Arguments
/// * `level` - Log level.
/// * `filepath` - Log file path.
fn initiate_logger(level: LevelFilter, filepath: &str) {
    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond]"
        ))
        .build();

    // Log to the terminal
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    // Log to the file
    match File::create(filepath) {
        Ok(file) => {
            loggers.push(WriteLogger::new(level, config, file));
        }
        Err(error) => {
            eprintln!("Failed to create the log file: {error}.");
        }
    }

    let _ = CombinedLogger::init(loggers);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_filter() {
        assert_eq!(get_log_filter(Some(&0)), LevelFilter::Off);
        assert_eq!(get_log_filter(Some(&1)), LevelFilter::Error);
        assert_eq!(get_log_filter(Some(&2)), LevelFilter::Warn);
        assert_eq!(get_log_filter(Some(&3)), LevelFilter::Info);
        assert_eq!(get_log_filter(Some(&4)), LevelFilter::Debug);
        assert_eq!(get_log_filter(Some(&5)), LevelFilter::Trace);

        assert_eq!(get_log_filter(Some(&6)), LevelFilter::Info);

        assert_eq!(get_log_filter(None), LevelFilter::Info);
    }
}
