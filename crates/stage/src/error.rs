//! Stage error types.

use crate::entity::EntityId;
use glam::Vec2;
use quadtree::QuadTreeError;
use thiserror::Error;

/// Errors that can occur while driving the stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Invalid index setup: {0}")]
    Index(#[from] QuadTreeError),

    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("Entity {id} at {position} is outside the universe")]
    OutsideUniverse { id: EntityId, position: Vec2 },
}
