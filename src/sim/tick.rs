//! Fixed-step simulation tick
//!
//! Advances an episode by exactly one frame in a fixed order: player, speed,
//! scroll, spawn, cull, collide, score.

use serde::{Deserialize, Serialize};

use super::collision::first_collision;
use super::spawner::ObstacleSpawner;
use super::state::{EpisodePhase, EpisodeState};
use crate::tuning::Tuning;

/// Discrete control command for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Action {
    #[default]
    Noop,
    Up,
    Down,
    /// Hold to speed the world up
    Accelerate,
}

impl Action {
    /// Number of discrete actions
    pub const COUNT: usize = 4;

    pub const ALL: [Action; Self::COUNT] = [Action::Noop, Action::Up, Action::Down, Action::Accelerate];

    /// Map a raw action id; anything outside `0..COUNT` is a no-op
    pub fn from_index(raw: i64) -> Self {
        match raw {
            1 => Action::Up,
            2 => Action::Down,
            3 => Action::Accelerate,
            _ => Action::Noop,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Action::Noop => 0,
            Action::Up => 1,
            Action::Down => 2,
            Action::Accelerate => 3,
        }
    }

    /// Vertical displacement direction (-1 up, +1 down)
    fn direction(&self) -> f32 {
        match self {
            Action::Up => -1.0,
            Action::Down => 1.0,
            Action::Noop | Action::Accelerate => 0.0,
        }
    }
}

impl From<u8> for Action {
    fn from(raw: u8) -> Self {
        Action::from_index(raw as i64)
    }
}

/// What a single tick produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickResult {
    pub reward: f64,
    /// ID of the obstacle the cat hit on this frame
    pub crashed_into: Option<u32>,
}

/// Advance the episode by one frame. Callers must not tick a terminal episode.
pub fn tick(
    state: &mut EpisodeState,
    spawner: &mut ObstacleSpawner,
    tuning: &Tuning,
    action: Action,
) -> TickResult {
    debug_assert!(!state.is_terminal(), "tick on a terminal episode");

    state.player.shift(action.direction() * tuning.player_step_px);

    state.advance_speed(action == Action::Accelerate, tuning);

    let dx = tuning.scroll_px_per_frame * state.speed;
    for obstacle in &mut state.obstacles {
        obstacle.advance(dx);
    }

    spawner.update(state, tuning);

    state.obstacles.retain(|o| o.alive);

    if let Some(index) = first_collision(&state.player.rect(), &state.obstacles) {
        let obstacle = &state.obstacles[index];
        log::debug!(
            "crash into {} #{} at frame {} (score {:.1})",
            obstacle.kind.as_str(),
            obstacle.id,
            state.frame,
            state.score
        );
        let crashed_into = Some(obstacle.id);
        state.phase = EpisodePhase::Terminal;
        return TickResult {
            reward: tuning.crash_penalty,
            crashed_into,
        };
    }

    state.score += tuning.survive_reward;
    state.frame += 1;
    TickResult {
        reward: tuning.survive_reward,
        crashed_into: None,
    }
}
