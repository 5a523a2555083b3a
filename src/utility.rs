use approx::assert_relative_eq;
use config::Config;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::error::GuiderError;

/// Trait for parsing the configuration value.
///
/// # Parameters
/// * `Self` - Type of the configuration value.
pub trait ConfigValue: Sized {
    /// Parse the configuration value.
    ///
    /// # Parameters
    /// * `s` - String to parse.
    ///
    /// # Returns
    /// The parsed configuration value. None if the string can not be parsed.
    fn parse_value(s: &str) -> Option<Self>;
}

impl ConfigValue for String {
    fn parse_value(s: &str) -> Option<Self> {
        Some(s.to_string())
    }
}

impl ConfigValue for f64 {
    fn parse_value(s: &str) -> Option<Self> {
        s.parse::<f64>().ok()
    }
}

impl ConfigValue for usize {
    fn parse_value(s: &str) -> Option<Self> {
        s.parse::<usize>().ok()
    }
}

impl ConfigValue for i32 {
    fn parse_value(s: &str) -> Option<Self> {
        s.parse::<i32>().ok()
    }
}

/// Get the configuation from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
///
/// # Returns
/// The configuration.
///
/// # Errors
/// If the file can not be read.
pub fn get_config(filepath: &Path) -> Result<Config, GuiderError> {
    let name = filepath
        .to_str()
        .ok_or_else(|| GuiderError::Config(format!("{:?} is not a valid path", filepath)))?;

    Config::builder()
        .add_source(config::File::with_name(name))
        .build()
        .map_err(|error| GuiderError::Config(format!("can not read {name}: {error}")))
}

/// Get the parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
///
/// # Returns
/// The parameter.
///
/// # Errors
/// If the key is missing or the value can not be parsed.
pub fn get_parameter<T: ConfigValue>(filepath: &Path, key: &str) -> Result<T, GuiderError> {
    let config = get_config(filepath)?;
    let value = config
        .get_string(key)
        .map_err(|_| GuiderError::Config(format!("no {key} in {:?}", filepath)))?;

    T::parse_value(&value)
        .ok_or_else(|| GuiderError::Config(format!("can not parse {key}: {value}")))
}

/// Get the array parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
///
/// # Returns
/// The array parameter.
///
/// # Errors
/// If the key is missing or any element can not be parsed.
pub fn get_parameter_array<T: ConfigValue>(
    filepath: &Path,
    key: &str,
) -> Result<Vec<T>, GuiderError> {
    let config = get_config(filepath)?;
    let config_array = config
        .get_array(key)
        .map_err(|_| GuiderError::Config(format!("no array {key} in {:?}", filepath)))?;

    config_array
        .into_iter()
        .map(|x| {
            x.into_string()
                .ok()
                .and_then(|s| T::parse_value(&s))
                .ok_or_else(|| GuiderError::Config(format!("bad element in {key}")))
        })
        .collect()
}

/// Get the matrix parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
///
/// # Returns
/// The matrix parameter as rows.
///
/// # Errors
/// If the key is missing or any element can not be parsed.
pub fn get_parameter_matrix<T: ConfigValue>(
    filepath: &Path,
    key: &str,
) -> Result<Vec<Vec<T>>, GuiderError> {
    let config = get_config(filepath)?;
    let config_array = config
        .get_array(key)
        .map_err(|_| GuiderError::Config(format!("no matrix {key} in {:?}", filepath)))?;

    config_array
        .into_iter()
        .map(|row| {
            let row = row
                .into_array()
                .map_err(|_| GuiderError::Config(format!("bad row in {key}")))?;

            row.into_iter()
                .map(|y| {
                    y.into_string()
                        .ok()
                        .and_then(|s| T::parse_value(&s))
                        .ok_or_else(|| GuiderError::Config(format!("bad element in {key}")))
                })
                .collect()
        })
        .collect()
}

/// Write the content to a file atomically. The content is written to a
/// temporary file in the same directory first and then renamed, so a reader
/// never sees a partially written file.
///
/// # Arguments
/// * `filepath` - Path of the file.
/// * `content` - Content to write.
///
/// # Errors
/// If the file can not be written or renamed.
pub fn write_file_atomic(filepath: &Path, content: &[u8]) -> Result<(), GuiderError> {
    let directory = match filepath.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file =
        NamedTempFile::new_in(directory).map_err(|error| GuiderError::storage(filepath, error))?;
    file.write_all(content)
        .and_then(|_| file.flush())
        .map_err(|error| GuiderError::storage(filepath, error))?;
    file.persist(filepath)
        .map_err(|error| GuiderError::storage(filepath, error.error))?;

    Ok(())
}

/// Convert the time in second to a duration.
///
/// # Arguments
/// * `seconds` - Time in second.
///
/// # Returns
/// Duration. None if the time is negative, not a number, or too large.
pub fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

/// Assert that two vectors are equal within a relative tolerance.
///
/// # Parameters
/// * `v1` - First vector.
/// * `v2` - Second vector.
/// * `epsilon` - Relative tolerance.
///
/// # Panics
/// If the two vectors are not equal within the relative tolerance.
pub fn assert_relative_eq_vector(v1: &[f64], v2: &[f64], epsilon: f64) {
    assert_eq!(v1.len(), v2.len());
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert_relative_eq!(a, b, epsilon = epsilon);
    }
}

#[cfg(test)]
mod tests {
    use std::f64::EPSILON;

    use super::*;
    use approx::assert_relative_eq;
    use std::fs::read_to_string;
    use tempfile::tempdir;

    #[test]
    fn test_get_config() {
        let filepath = Path::new("config/parameters_guider.yaml");
        let exposure_time = get_config(filepath)
            .unwrap()
            .get_float("exposure_time")
            .unwrap();

        assert_relative_eq!(exposure_time, 15.0, epsilon = EPSILON);
    }

    #[test]
    fn test_get_config_error() {
        assert!(matches!(
            get_config(Path::new("wrong.yaml")),
            Err(GuiderError::Config(_))
        ));
    }

    #[test]
    fn test_get_parameter() {
        let filepath = Path::new("config/parameters_guider.yaml");

        let calibration_file: String = get_parameter(filepath, "calibration_file").unwrap();
        assert_eq!(calibration_file, "/tmp/is_calibration.json");

        let shift: i32 = get_parameter(filepath, "calibration_shift").unwrap();
        assert_eq!(shift, 50);

        let max_rotation: f64 = get_parameter(filepath, "max_rotation").unwrap();
        assert_relative_eq!(max_rotation, 0.01, epsilon = EPSILON);

        assert!(get_parameter::<f64>(filepath, "no_such_key").is_err());
        assert!(get_parameter::<i32>(filepath, "calibration_file").is_err());
    }

    #[test]
    fn test_get_parameter_array() {
        let position: Vec<f64> = get_parameter_array(
            Path::new("config/parameters_simulation.yaml"),
            "star_position",
        )
        .unwrap();

        assert_eq!(position, vec![64.0, 32.0]);
    }

    #[test]
    fn test_get_parameter_matrix() {
        let response: Vec<Vec<f64>> =
            get_parameter_matrix(Path::new("config/parameters_simulation.yaml"), "response")
                .unwrap();

        assert_eq!(response.len(), 2);
        assert_relative_eq_vector(&response[0], &[0.02, 0.002], EPSILON);
        assert_relative_eq_vector(&response[1], &[0.002, -0.025], EPSILON);
    }

    #[test]
    fn test_write_file_atomic() {
        let dir = tempdir().unwrap();
        let filepath = dir.path().join("content.txt");

        write_file_atomic(&filepath, b"first").unwrap();
        write_file_atomic(&filepath, b"second").unwrap();

        assert_eq!(read_to_string(&filepath).unwrap(), "second");

        // Only the target file is left in the directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_file_atomic_error() {
        let result = write_file_atomic(Path::new("/no/such/directory/file.txt"), b"content");

        assert!(matches!(result, Err(GuiderError::Storage { .. })));
    }

    #[test]
    fn test_seconds_to_duration() {
        assert_eq!(seconds_to_duration(1.5), Some(Duration::from_millis(1500)));
        assert_eq!(seconds_to_duration(0.0), Some(Duration::ZERO));

        assert_eq!(seconds_to_duration(-1.0), None);
        assert_eq!(seconds_to_duration(f64::NAN), None);
        assert_eq!(seconds_to_duration(f64::INFINITY), None);
        assert_eq!(seconds_to_duration(1e20), None);
    }

    #[test]
    #[should_panic(expected = "`left == right` failed")]
    fn test_assert_relative_eq_vector_panic() {
        assert_relative_eq_vector(&[0.0, 0.0], &[0.0, 1.0, 0.0], EPSILON);
    }
}
