//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One fixed step per frame
//! - Seeded RNG only (owned by the spawner)
//! - Stable iteration order (obstacles sorted by position)
//! - No rendering, input or storage dependencies

pub mod collision;
pub mod simulation;
pub mod spawner;
pub mod state;
pub mod tick;

use thiserror::Error;

pub use collision::{Rect, collides, first_collision};
pub use simulation::{Simulation, StepOutcome};
pub use spawner::{ObstacleSpawner, SpawnPhase};
pub use state::{EpisodePhase, EpisodeState, Obstacle, ObstacleKind, Observation, Player};
pub use tick::{Action, TickResult, tick};

/// Simulation construction failures
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid tuning: {0}")]
    Tuning(#[from] crate::tuning::TuningError),
    #[error("no entropy source for the obstacle spawner: {0}")]
    Entropy(String),
}
