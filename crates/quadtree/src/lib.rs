//! Mutable region quadtree.
//!
//! This crate contains:
//! - Geometric primitives (`Point`, `Bounds`)
//! - The `QuadTree` node with insert/remove, range and nearest-neighbor
//!   queries, and `refresh` for points that moved after insertion

mod error;
mod geometry;
mod tree;

pub use error::QuadTreeError;
pub use geometry::{Bounds, BoundsArgs, Point, PointId};
pub use tree::{QuadTree, DEFAULT_CAPACITY, DEFAULT_MAX_DEPTH};
