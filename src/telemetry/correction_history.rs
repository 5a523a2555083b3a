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

use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::GuiderError;
use crate::utility::write_file_atomic;

/// Applied correction.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct CorrectionRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    // Image offset in x in pixel.
    pub dx: f64,
    // Image offset in y in pixel.
    pub dy: f64,
}

// Layout of the history file.
#[derive(Serialize, Deserialize, Debug)]
struct HistoryFile {
    time_values: Vec<String>,
    x_values: Vec<f64>,
    y_values: Vec<f64>,
}

/// History of the applied corrections in a guiding session.
#[derive(Clone, Default, Debug)]
pub struct CorrectionHistory {
    _records: Vec<CorrectionRecord>,
}

impl CorrectionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a correction with the current time.
    ///
    /// # Arguments
    /// * `dx` - Image offset in x in pixel.
    /// * `dy` - Image offset in y in pixel.
    pub fn add_point(&mut self, dx: f64, dy: f64) {
        self.add_record(CorrectionRecord {
            timestamp: OffsetDateTime::now_utc(),
            dx: dx,
            dy: dy,
        });
    }

    /// Add a correction.
    ///
    /// # Arguments
    /// * `record` - Correction.
    pub fn add_record(&mut self, record: CorrectionRecord) {
        self._records.push(record);
    }

    /// Clear the history.
    pub fn clear(&mut self) {
        self._records.clear();
    }

    pub fn len(&self) -> usize {
        self._records.len()
    }

    pub fn is_empty(&self) -> bool {
        self._records.is_empty()
    }

    /// Get the corrections in the order of addition.
    pub fn records(&self) -> &[CorrectionRecord] {
        &self._records
    }

    /// Root mean square of the corrections.
    ///
    /// # Returns
    /// RMS of (dx, dy) in pixel. None if the history is empty.
    pub fn rms(&self) -> Option<(f64, f64)> {
        if self._records.is_empty() {
            return None;
        }

        let number = self._records.len() as f64;
        let (sum_x, sum_y) = self
            ._records
            .iter()
            .fold((0.0, 0.0), |(x, y), record| {
                (x + record.dx * record.dx, y + record.dy * record.dy)
            });

        Some(((sum_x / number).sqrt(), (sum_y / number).sqrt()))
    }

    /// Default filename of the history. This is based on the time of the
    /// first correction.
    ///
    /// # Returns
    /// Filename such as "2024-03-01_22h05m09s.json". None if the history is
    /// empty.
    pub fn default_filename(&self) -> Option<String> {
        let first = self._records.first()?;

        first
            .timestamp
            .format(format_description!(
                "[year]-[month]-[day]_[hour]h[minute]m[second]s.json"
            ))
            .ok()
    }

    /// Save the history as JSON.
    ///
    /// # Arguments
    /// * `filepath` - Path of the file.
    ///
    /// # Errors
    /// If the file can not be written.
    pub fn save(&self, filepath: &Path) -> Result<(), GuiderError> {
        let time_values = self
            ._records
            .iter()
            .map(|record| record.timestamp.format(&Rfc3339))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|error| GuiderError::storage(filepath, error))?;

        let history = HistoryFile {
            time_values: time_values,
            x_values: self._records.iter().map(|record| record.dx).collect(),
            y_values: self._records.iter().map(|record| record.dy).collect(),
        };

        let content = serde_json::to_string_pretty(&history)
            .map_err(|error| GuiderError::storage(filepath, error))?;

        write_file_atomic(filepath, content.as_bytes())
    }

    /// Load the history from JSON.
    ///
    /// # Arguments
    /// * `filepath` - Path of the file.
    ///
    /// # Returns
    /// History.
    ///
    /// # Errors
    /// If the file can not be read, or the columns have different lengths.
    pub fn load(filepath: &Path) -> Result<Self, GuiderError> {
        let content =
            read_to_string(filepath).map_err(|error| GuiderError::storage(filepath, error))?;
        let history: HistoryFile =
            serde_json::from_str(&content).map_err(|error| GuiderError::storage(filepath, error))?;

        let number = history.time_values.len();
        if (history.x_values.len() != number) || (history.y_values.len() != number) {
            return Err(GuiderError::storage(
                filepath,
                "time_values, x_values, and y_values have different lengths",
            ));
        }

        let mut correction_history = Self::new();
        for ((time_value, dx), dy) in history
            .time_values
            .iter()
            .zip(history.x_values)
            .zip(history.y_values)
        {
            let timestamp = OffsetDateTime::parse(time_value, &Rfc3339)
                .map_err(|error| GuiderError::storage(filepath, error))?;

            correction_history.add_record(CorrectionRecord {
                timestamp: timestamp,
                dx: dx,
                dy: dy,
            });
        }

        Ok(correction_history)
    }

    /// Export the history as CSV with the columns of time, dx, and dy.
    ///
    /// # Arguments
    /// * `filepath` - Path of the file.
    ///
    /// # Errors
    /// If the file can not be written.
    pub fn export_csv(&self, filepath: &Path) -> Result<(), GuiderError> {
        let mut writer =
            Writer::from_path(filepath).map_err(|error| GuiderError::storage(filepath, error))?;

        writer
            .write_record(["time", "dx", "dy"])
            .map_err(|error| GuiderError::storage(filepath, error))?;

        for record in &self._records {
            let timestamp = record
                .timestamp
                .format(&Rfc3339)
                .map_err(|error| GuiderError::storage(filepath, error))?;

            writer
                .write_record([timestamp, record.dx.to_string(), record.dy.to_string()])
                .map_err(|error| GuiderError::storage(filepath, error))?;
        }

        writer
            .flush()
            .map_err(|error| GuiderError::storage(filepath, error))
    }
}
