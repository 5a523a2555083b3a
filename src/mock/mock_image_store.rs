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

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::GuiderError;
use crate::image::frame::{Frame, ImageStore};
use crate::mock::mock_constants::MAX_STORED_FRAMES;

#[derive(Default)]
struct StoredFrames {
    // Frame and the tick of its last use.
    frames: HashMap<PathBuf, (u64, Frame)>,
    tick: u64,
}

impl StoredFrames {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Remove the least recently used frames until the number of the frames
    /// is within the capacity.
    fn evict(&mut self, capacity: usize) {
        while self.frames.len() > capacity {
            let oldest = self
                .frames
                .iter()
                .min_by_key(|(_, (tick, _))| *tick)
                .map(|(path, _)| path.clone());

            match oldest {
                Some(path) => {
                    self.frames.remove(&path);
                }
                None => break,
            }
        }
    }
}

/// In-memory image storage. The clones share the same frames. The least
/// recently used frame is dropped when the storage is full.
#[derive(Clone)]
pub struct MockImageStore {
    _frames: Arc<Mutex<StoredFrames>>,
    _capacity: usize,
}

impl Default for MockImageStore {
    fn default() -> Self {
        Self::with_capacity(MAX_STORED_FRAMES)
    }
}

impl MockImageStore {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty storage.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of the frames (at least 1).
    ///
    /// # Returns
    /// New storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            _frames: Arc::new(Mutex::new(StoredFrames::default())),
            _capacity: capacity.max(1),
        }
    }

    /// Number of the frames.
    pub fn len(&self) -> usize {
        self._frames.lock().frames.len()
    }

    /// The storage is empty or not.
    pub fn is_empty(&self) -> bool {
        self._frames.lock().frames.is_empty()
    }

    /// Remove the frame.
    ///
    /// # Arguments
    /// * `path` - Path of the frame.
    pub fn remove(&self, path: &Path) {
        self._frames.lock().frames.remove(path);
    }
}

impl ImageStore for MockImageStore {
    fn load(&self, path: &Path) -> Result<Frame, GuiderError> {
        let mut stored = self._frames.lock();
        let tick = stored.next_tick();

        match stored.frames.get_mut(path) {
            Some((last_used, frame)) => {
                *last_used = tick;
                Ok(frame.clone())
            }
            None => Err(GuiderError::storage(path, "no such frame")),
        }
    }

    fn save(&self, path: &Path, frame: &Frame) -> Result<(), GuiderError> {
        let mut stored = self._frames.lock();
        let tick = stored.next_tick();

        stored
            .frames
            .insert(path.to_path_buf(), (tick, frame.clone()));
        stored.evict(self._capacity);

        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self._frames.lock().frames.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let store = MockImageStore::new();
        let store_shared = store.clone();

        let path = Path::new("/tmp/frame.json");
        store
            .save(path, &Frame::from_element(2, 3, 1.5))
            .unwrap();

        assert!(store_shared.exists(path));
        assert_eq!(store_shared.len(), 1);
        assert_eq!(store_shared.load(path).unwrap()[(1, 2)], 1.5);

        store_shared.remove(path);

        assert!(store.is_empty());
        assert!(matches!(
            store.load(path),
            Err(GuiderError::Storage { .. })
        ));
    }

    #[test]
    fn test_capacity() {
        let store = MockImageStore::with_capacity(2);

        let path_a = Path::new("/tmp/a.json");
        let path_b = Path::new("/tmp/b.json");
        let path_c = Path::new("/tmp/c.json");

        store.save(path_a, &Frame::from_element(2, 2, 1.0)).unwrap();
        store.save(path_b, &Frame::from_element(2, 2, 2.0)).unwrap();

        // The loaded frame is kept and the other one is dropped.
        store.load(path_a).unwrap();
        store.save(path_c, &Frame::from_element(2, 2, 3.0)).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.exists(path_a));
        assert!(!store.exists(path_b));
        assert!(store.exists(path_c));

        // Overwriting a frame does not drop any other one.
        store.save(path_c, &Frame::from_element(2, 2, 4.0)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.load(path_c).unwrap()[(0, 0)], 4.0);
    }

    #[test]
    fn test_default_capacity() {
        let store = MockImageStore::new();

        for index in 0..(MAX_STORED_FRAMES + 10) {
            store
                .save(
                    &PathBuf::from(format!("/tmp/image_{index:05}.json")),
                    &Frame::from_element(1, 1, index as f32),
                )
                .unwrap();
        }

        assert_eq!(store.len(), MAX_STORED_FRAMES);
        assert!(!store.exists(Path::new("/tmp/image_00000.json")));
    }
}
