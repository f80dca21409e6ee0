//! Rock, paper, scissors stage.
//!
//! Every object hunts the kind it beats. Each kind lives in its own
//! quadtree so the nearest prey is a single `find_closest` away.

pub mod config;
pub mod entity;
pub mod error;
pub mod runner;
pub mod stage;

pub use config::Config;
pub use entity::{Entity, EntityId, Kind};
pub use error::StageError;
pub use runner::{RunSummary, run};
pub use stage::{KindCounts, Stage, TickReport};
