//! Agent-facing `reset`/`step` interface over the tick loop

use super::SimError;
use super::spawner::ObstacleSpawner;
use super::state::{EpisodeState, Observation};
use super::tick::{Action, tick};
use crate::tuning::Tuning;

/// Result of one `step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
}

/// One independent game instance.
///
/// Single-threaded and synchronous: every call completes one frame. Run several
/// instances for parallel episodes; they share nothing.
///
/// Stepping a terminal episode is a no-op that returns the final observation,
/// a reward of 0 and `done = true` until the next `reset`.
#[derive(Debug, Clone)]
pub struct Simulation {
    tuning: Tuning,
    episode: EpisodeState,
    spawner: ObstacleSpawner,
    last_observation: Observation,
}

impl Simulation {
    /// New simulation with default tuning, already reset
    pub fn new(seed: u64) -> Self {
        let tuning = Tuning::default();
        let spawner = ObstacleSpawner::new(seed);
        Self::assemble(tuning, spawner)
    }

    /// New simulation with custom tuning, already reset
    pub fn with_tuning(seed: u64, tuning: Tuning) -> Result<Self, SimError> {
        tuning.validate()?;
        Ok(Self::assemble(tuning, ObstacleSpawner::new(seed)))
    }

    /// New simulation seeded from OS entropy. Fails if no entropy is available.
    pub fn from_entropy(tuning: Tuning) -> Result<Self, SimError> {
        tuning.validate()?;
        let spawner = ObstacleSpawner::from_os_rng()?;
        log::info!("Simulation seeded from OS entropy: {}", spawner.seed());
        Ok(Self::assemble(tuning, spawner))
    }

    fn assemble(tuning: Tuning, spawner: ObstacleSpawner) -> Self {
        let episode = EpisodeState::new(&tuning);
        let mut sim = Self {
            last_observation: episode.observation(&tuning),
            tuning,
            episode,
            spawner,
        };
        sim.reset();
        sim
    }

    /// Start a new episode. The spawner's random stream continues, so
    /// successive episodes differ.
    pub fn reset(&mut self) -> Observation {
        self.episode = EpisodeState::new(&self.tuning);
        self.spawner.rearm(&self.tuning);
        self.last_observation = self.episode.observation(&self.tuning);
        self.last_observation
    }

    /// Reseed the spawner, then reset
    pub fn reset_with_seed(&mut self, seed: u64) -> Observation {
        self.spawner.reseed(seed);
        self.reset()
    }

    /// Advance one frame with `action`
    pub fn step(&mut self, action: Action) -> StepOutcome {
        if self.episode.is_terminal() {
            return StepOutcome {
                observation: self.last_observation,
                reward: 0.0,
                done: true,
            };
        }

        let result = tick(&mut self.episode, &mut self.spawner, &self.tuning, action);
        self.last_observation = self.episode.observation(&self.tuning);

        StepOutcome {
            observation: self.last_observation,
            reward: result.reward,
            done: self.episode.is_terminal(),
        }
    }

    /// `step` with a raw action id; unknown ids act as no-ops
    pub fn step_index(&mut self, raw: i64) -> StepOutcome {
        self.step(Action::from_index(raw))
    }

    /// Observation of the current state
    pub fn observation(&self) -> Observation {
        self.last_observation
    }

    pub fn episode(&self) -> &EpisodeState {
        &self.episode
    }

    /// Direct state access for building test scenarios and tools.
    ///
    /// The cached observation is refreshed on the next `step`/`reset`.
    pub fn episode_mut(&mut self) -> &mut EpisodeState {
        &mut self.episode
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn seed(&self) -> u64 {
        self.spawner.seed()
    }

    pub fn is_done(&self) -> bool {
        self.episode.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::state::{EpisodePhase, ObstacleKind};
    use glam::Vec2;

    #[test]
    fn test_reset_initial_state() {
        let mut sim = Simulation::new(42);
        for _ in 0..50 {
            sim.step(Action::Accelerate);
        }
        let obs = sim.reset();
        let episode = sim.episode();
        assert_eq!(episode.phase, EpisodePhase::Running);
        assert!(episode.obstacles.is_empty());
        assert_eq!(episode.score, 0.0);
        assert_eq!(episode.frame, 0);
        assert_eq!(episode.speed, sim.tuning().speed_min);
        assert_eq!(obs.speed, 0.0);
        assert_eq!(obs.obstacle_distance, 1.0);
    }

    #[test]
    fn test_consecutive_resets_agree() {
        let mut sim = Simulation::new(42);
        for _ in 0..30 {
            sim.step(Action::Down);
        }
        let first = sim.reset();
        let first_state = sim.episode().clone();
        let second = sim.reset();
        assert_eq!(first, second);
        assert_eq!(sim.episode(), &first_state);
        assert_eq!(sim.observation(), second);
    }

    #[test]
    fn test_step_clamps_player_to_canvas() {
        let mut sim = Simulation::new(4);
        for _ in 0..200 {
            sim.episode_mut().obstacles.clear();
            assert!(!sim.step(Action::Down).done);
        }
        assert_eq!(sim.episode().player.y, FIELD_H - PLAYER_H);
        assert_eq!(sim.observation().player_y, (FIELD_H - PLAYER_H) / FIELD_H);

        for _ in 0..200 {
            sim.episode_mut().obstacles.clear();
            assert!(!sim.step(Action::Up).done);
        }
        assert_eq!(sim.episode().player.y, 0.0);
        assert_eq!(sim.observation().player_y, 0.0);
    }

    #[test]
    fn test_step_after_terminal_is_noop() {
        let mut sim = Simulation::new(1);
        let player = sim.episode().player.rect();
        sim.episode_mut()
            .spawn_obstacle(ObstacleKind::Ghost, player.pos, Vec2::splat(10.0));

        let crash = sim.step(Action::Noop);
        assert!(crash.done);
        assert_eq!(crash.reward, -100.0);

        let frozen = sim.episode().clone();
        for action in Action::ALL {
            let outcome = sim.step(action);
            assert!(outcome.done);
            assert_eq!(outcome.reward, 0.0);
            assert_eq!(outcome.observation, crash.observation);
        }
        assert_eq!(sim.episode(), &frozen);
    }

    #[test]
    fn test_reset_with_seed_reproduces() {
        let mut sim = Simulation::new(5);
        let run = |sim: &mut Simulation| {
            let mut trace = Vec::new();
            for i in 0..400 {
                let outcome = sim.step_index(i % 4);
                trace.push(outcome.observation);
                if outcome.done {
                    break;
                }
            }
            trace
        };
        sim.reset_with_seed(77);
        let first = run(&mut sim);
        sim.reset_with_seed(77);
        let second = run(&mut sim);
        assert_eq!(first, second);
        assert_eq!(sim.seed(), 77);
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let tuning = Tuning {
            speed_max: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::with_tuning(1, tuning),
            Err(SimError::Tuning(_))
        ));
    }

    #[test]
    fn test_observation_tracks_player() {
        let mut sim = Simulation::new(9);
        let before = sim.observation();
        let outcome = sim.step(Action::Up);
        let step = sim.tuning().player_step_px / FIELD_H;
        assert!((before.player_y - outcome.observation.player_y - step).abs() < 1e-6);
        assert_eq!(sim.observation(), outcome.observation);
    }
}
