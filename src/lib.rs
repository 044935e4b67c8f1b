//! Halloween Run - a pixel-art side-scroller with an agent-friendly API
//!
//! Core modules:
//! - `sim`: Deterministic simulation (player, obstacles, spawner, collisions)
//! - `tuning`: Data-driven game balance
//! - `session`: Fixed-timestep host loop, episode bookkeeping
//! - `agent`: Policies and headless rollouts over the `reset`/`step` API
//! - `renderer`: Low-res software canvas, scene drawing and WebGPU upscaling
//! - `highscores`: Best-score persistence
//! - `input`: Keyboard/gamepad to action mapping
//! - `music`: Background tune score and loop timing

pub mod agent;
#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod highscores;
pub mod input;
pub mod music;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::{HighScore, HighScoreStore, PersistenceError};
pub use settings::{PolicyKind, Settings};
pub use sim::{Action, Observation, SimError, Simulation, StepOutcome};
pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Internal canvas width in pixels (all simulation coordinates live here)
    pub const INTERNAL_W: u32 = 200;
    /// Internal canvas height in pixels
    pub const INTERNAL_H: u32 = 150;
    /// Internal canvas width as a simulation coordinate
    pub const FIELD_W: f32 = INTERNAL_W as f32;
    /// Internal canvas height as a simulation coordinate
    pub const FIELD_H: f32 = INTERNAL_H as f32;

    /// Fixed simulation rate (one `step` per frame)
    pub const SIM_FPS: u32 = 60;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / SIM_FPS as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Player (cat) sprite size
    pub const PLAYER_W: f32 = 10.0;
    pub const PLAYER_H: f32 = 10.0;
    /// Fixed horizontal position of the player's left edge
    pub const PLAYER_X: f32 = 40.0;

    /// Sky band above the path (cosmetic only, the cat may fly into it)
    pub const PATH_MARGIN_TOP: u32 = 40;
    /// Fence band below the path (cosmetic only)
    pub const PATH_MARGIN_BOTTOM: u32 = 10;
}

/// Normalize `value` from `[min, max]` into `[0, 1]`, clamping outliers.
#[inline]
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}
