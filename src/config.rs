//! Construction-time tuning for `ChainedMap`.

use crate::error::MapError;

/// Number of buckets a freshly constructed (or cleared) map starts with.
pub const DEFAULT_INITIAL_CAPACITY: usize = 101;

/// Maximum `len / bucket_count` ratio tolerated after an insertion.
pub const DEFAULT_LOAD_THRESHOLD: f64 = 1.5;

/// Smallest accepted threshold: at most 100 buckets per stored entry.
pub const MIN_LOAD_THRESHOLD: f64 = 0.01;

/// Table sizing parameters.
///
/// ```
/// use chained_map::{ChainedMap, MapConfig};
///
/// let cfg = MapConfig::new().initial_capacity(7).load_threshold(0.75);
/// let map: ChainedMap<&str, i32> = ChainedMap::with_config(cfg).unwrap();
/// assert_eq!(map.bucket_count(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    initial_capacity: usize,
    load_threshold: f64,
}

impl MapConfig {
    pub const fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_threshold: DEFAULT_LOAD_THRESHOLD,
        }
    }

    pub fn initial_capacity(mut self, buckets: usize) -> Self {
        self.initial_capacity = buckets;
        self
    }

    pub fn load_threshold(mut self, threshold: f64) -> Self {
        self.load_threshold = threshold;
        self
    }

    pub fn get_initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn get_load_threshold(&self) -> f64 {
        self.load_threshold
    }

    /// Rejects a zero-bucket table and thresholds that are not a finite
    /// ratio of at least [`MIN_LOAD_THRESHOLD`].
    pub fn validate(&self) -> Result<(), MapError> {
        if self.initial_capacity == 0 {
            return Err(MapError::InvalidCapacity {
                capacity: self.initial_capacity,
            });
        }
        if !self.load_threshold.is_finite() || self.load_threshold < MIN_LOAD_THRESHOLD {
            return Err(MapError::InvalidLoadThreshold {
                threshold: self.load_threshold,
            });
        }
        Ok(())
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}
