//! Quadtree error types.

use thiserror::Error;

/// Errors that can occur while building index geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadTreeError {
    #[error("Bounds must be initialized with either a corner or both x and y")]
    MissingCorner,

    #[error("Invalid bounds extent: width {width}, height {height}")]
    InvalidExtent { width: f32, height: f32 },

    #[error("Capacity must be at least 1")]
    ZeroCapacity,
}
