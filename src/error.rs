//! Error type shared by the fallible parts of the map API.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// The operation is a permanent capability limitation of `ChainedMap`;
    /// retrying cannot succeed.
    #[error("operation `{operation}` is not supported by ChainedMap")]
    Unsupported { operation: &'static str },
    #[error("initial capacity must be at least 1 bucket, got {capacity}")]
    InvalidCapacity { capacity: usize },
    #[error("load threshold must be finite and greater than zero, got {threshold}")]
    InvalidLoadThreshold { threshold: f64 },
}
