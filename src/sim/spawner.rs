//! Obstacle spawning
//!
//! A two-state machine evaluated once per frame: a cooldown counts down while
//! Waiting, then the spawner stays Armed until the newest obstacle has opened
//! enough room at the right edge. Randomness comes only from the spawner's own
//! seeded PCG stream.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::{EpisodeState, ObstacleKind};
use super::SimError;
use crate::consts::*;
use crate::tuning::Tuning;

/// Spawner state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnPhase {
    /// Counting down frames until the next spawn attempt
    Waiting { frames_left: u32 },
    /// Will spawn as soon as the spacing rule allows
    Armed,
}

/// Decides when, where and what obstacle enters the field
#[derive(Debug, Clone)]
pub struct ObstacleSpawner {
    seed: u64,
    rng: Pcg32,
    phase: SpawnPhase,
}

impl ObstacleSpawner {
    /// Spawner with an explicit seed (reproducible)
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: SpawnPhase::Armed,
        }
    }

    /// Spawner seeded from the OS entropy source
    pub fn from_os_rng() -> Result<Self, SimError> {
        let mut seeder =
            Pcg32::try_from_os_rng().map_err(|e| SimError::Entropy(e.to_string()))?;
        Ok(Self::new(seeder.random()))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> SpawnPhase {
        self.phase
    }

    /// Restart the random stream from `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
    }

    /// Start a new episode: wait a fresh (unscaled) cooldown before the first spawn
    pub fn rearm(&mut self, tuning: &Tuning) {
        let frames_left = self
            .rng
            .random_range(tuning.spawn_cooldown_min..=tuning.spawn_cooldown_max)
            .max(1);
        self.phase = SpawnPhase::Waiting { frames_left };
    }

    /// Advance one frame; appends at most one obstacle. Returns true on spawn.
    pub fn update(&mut self, state: &mut EpisodeState, tuning: &Tuning) -> bool {
        if let SpawnPhase::Waiting { frames_left } = self.phase {
            let frames_left = frames_left.saturating_sub(1);
            if frames_left > 0 {
                self.phase = SpawnPhase::Waiting { frames_left };
                return false;
            }
            self.phase = SpawnPhase::Armed;
        }

        let gap = tuning.min_spawn_gap(state.speed);
        let room = state
            .obstacles
            .last()
            .is_none_or(|last| last.rect().right() + gap <= FIELD_W);
        if !room {
            return false;
        }

        self.spawn(state, tuning);
        self.phase = SpawnPhase::Waiting {
            frames_left: self.next_cooldown(state.speed, tuning),
        };
        true
    }

    /// Cooldown shrinks as the game speeds up, never below the floor
    fn next_cooldown(&mut self, speed: f32, tuning: &Tuning) -> u32 {
        let base = self
            .rng
            .random_range(tuning.spawn_cooldown_min..=tuning.spawn_cooldown_max);
        ((base as f32 / speed) as u32).max(tuning.spawn_cooldown_floor)
    }

    fn spawn(&mut self, state: &mut EpisodeState, tuning: &Tuning) {
        let sizes = tuning.obstacle_min_size..=tuning.obstacle_max_size;
        let w = self.rng.random_range(sizes.clone()) as f32;
        let h = self.rng.random_range(sizes) as f32;
        let kind = self.pick_kind(tuning);
        let jitter = self.rng.random_range(0..=tuning.spawn_jitter_px) as f32;

        let floor = FIELD_H - h;
        let y = match kind {
            ObstacleKind::Pumpkin => floor,
            ObstacleKind::Bat => tuning.flight_line_y.min(floor),
            ObstacleKind::Ghost => self.rng.random_range(0..=floor as u32) as f32,
        };

        let id = state.spawn_obstacle(kind, Vec2::new(FIELD_W + jitter, y), Vec2::new(w, h));
        log::trace!(
            "spawned {} #{} at y={} ({}x{}) speed={:.3}",
            kind.as_str(),
            id,
            y,
            w,
            h,
            state.speed
        );
    }

    /// Weighted choice over obstacle kinds
    fn pick_kind(&mut self, tuning: &Tuning) -> ObstacleKind {
        let weights = &tuning.kind_weights;
        // Validated tuning always has a non-zero total
        let Some(total) = weights.total().filter(|&t| t > 0) else {
            return ObstacleKind::Ghost;
        };
        let mut roll = self.rng.random_range(0..total);
        for (kind, weight) in [
            (ObstacleKind::Pumpkin, weights.pumpkin),
            (ObstacleKind::Ghost, weights.ghost),
            (ObstacleKind::Bat, weights.bat),
        ] {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        ObstacleKind::Ghost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::KindWeights;

    fn spawn_all(seed: u64, frames: u32) -> EpisodeState {
        let tuning = Tuning::default();
        let mut state = EpisodeState::new(&tuning);
        let mut spawner = ObstacleSpawner::new(seed);
        spawner.rearm(&tuning);
        for _ in 0..frames {
            for obstacle in &mut state.obstacles {
                obstacle.advance(tuning.scroll_px_per_frame * state.speed);
            }
            spawner.update(&mut state, &tuning);
            state.obstacles.retain(|o| o.alive);
        }
        state
    }

    #[test]
    fn test_waits_for_cooldown() {
        let tuning = Tuning::default();
        let mut state = EpisodeState::new(&tuning);
        let mut spawner = ObstacleSpawner::new(7);
        spawner.rearm(&tuning);

        let SpawnPhase::Waiting { frames_left } = spawner.phase() else {
            panic!("rearm must start in Waiting");
        };
        assert!(frames_left >= tuning.spawn_cooldown_min);

        for _ in 0..frames_left - 1 {
            assert!(!spawner.update(&mut state, &tuning));
        }
        assert!(state.obstacles.is_empty());
        assert!(spawner.update(&mut state, &tuning));
        assert_eq!(state.obstacles.len(), 1);
        assert!(matches!(spawner.phase(), SpawnPhase::Waiting { .. }));
    }

    #[test]
    fn test_armed_blocks_until_gap_opens() {
        let tuning = Tuning::default();
        let mut state = EpisodeState::new(&tuning);
        // Obstacle hugging the right edge leaves no room
        state.spawn_obstacle(
            ObstacleKind::Ghost,
            Vec2::new(FIELD_W - 10.0, 60.0),
            Vec2::splat(10.0),
        );
        let mut spawner = ObstacleSpawner::new(3);
        assert_eq!(spawner.phase(), SpawnPhase::Armed);
        assert!(!spawner.update(&mut state, &tuning));
        assert_eq!(spawner.phase(), SpawnPhase::Armed);

        state.obstacles[0].pos.x = FIELD_W - 10.0 - tuning.min_spawn_gap(state.speed);
        assert!(spawner.update(&mut state, &tuning));
        assert_eq!(state.obstacles.len(), 2);
    }

    #[test]
    fn test_same_seed_same_obstacles() {
        let a = spawn_all(1234, 2_000);
        let b = spawn_all(1234, 2_000);
        assert_eq!(a.obstacles, b.obstacles);

        let c = spawn_all(4321, 2_000);
        assert_ne!(a.obstacles, c.obstacles);
    }

    #[test]
    fn test_spawned_obstacles_follow_placement_rules() {
        let tuning = Tuning::default();
        let mut state = EpisodeState::new(&tuning);
        let mut spawner = ObstacleSpawner::new(99);
        for _ in 0..200 {
            state.obstacles.clear();
            spawner.update(&mut state, &tuning);
            spawner.phase = SpawnPhase::Armed;
            let obstacle = &state.obstacles[0];
            let min = tuning.obstacle_min_size as f32;
            let max = tuning.obstacle_max_size as f32;
            assert!((min..=max).contains(&obstacle.size.x));
            assert!((min..=max).contains(&obstacle.size.y));
            assert!(obstacle.pos.x >= FIELD_W);
            assert!(obstacle.pos.x <= FIELD_W + tuning.spawn_jitter_px as f32);
            assert!(obstacle.pos.y >= 0.0);
            assert!(obstacle.rect().bottom() <= FIELD_H);
            match obstacle.kind {
                ObstacleKind::Pumpkin => assert_eq!(obstacle.rect().bottom(), FIELD_H),
                ObstacleKind::Bat => assert_eq!(obstacle.pos.y, tuning.flight_line_y),
                ObstacleKind::Ghost => {}
            }
        }
    }

    #[test]
    fn test_sequence_stays_sorted_and_spaced() {
        let state = spawn_all(2024, 5_000);
        assert!(!state.obstacles.is_empty());
        for pair in state.obstacles.windows(2) {
            assert!(pair[0].pos.x < pair[1].pos.x);
            assert!(pair[0].rect().right() <= pair[1].pos.x);
        }
    }

    #[test]
    fn test_weights_select_only_enabled_kinds() {
        let tuning = Tuning {
            kind_weights: KindWeights {
                pumpkin: 0,
                ghost: 0,
                bat: 5,
            },
            ..Default::default()
        };
        let mut spawner = ObstacleSpawner::new(11);
        for _ in 0..100 {
            assert_eq!(spawner.pick_kind(&tuning), ObstacleKind::Bat);
        }
    }

    #[test]
    fn test_extreme_weights_do_not_panic() {
        let mut spawner = ObstacleSpawner::new(12);
        let saturated = Tuning {
            kind_weights: KindWeights {
                pumpkin: u32::MAX,
                ghost: 0,
                bat: 0,
            },
            ..Default::default()
        };
        assert_eq!(spawner.pick_kind(&saturated), ObstacleKind::Pumpkin);

        let overflowing = Tuning {
            kind_weights: KindWeights {
                pumpkin: u32::MAX,
                ghost: 1,
                bat: 0,
            },
            ..Default::default()
        };
        assert_eq!(spawner.pick_kind(&overflowing), ObstacleKind::Ghost);
    }

    #[test]
    fn test_cooldown_respects_floor() {
        let tuning = Tuning::default();
        let mut spawner = ObstacleSpawner::new(5);
        for _ in 0..100 {
            let fast = spawner.next_cooldown(tuning.speed_max * 10.0, &tuning);
            assert_eq!(fast, tuning.spawn_cooldown_floor);
            let slow = spawner.next_cooldown(tuning.speed_min, &tuning);
            assert!(slow >= tuning.spawn_cooldown_min && slow <= tuning.spawn_cooldown_max);
        }
    }

    #[test]
    fn test_reseed_restarts_stream() {
        let tuning = Tuning::default();
        let mut a = ObstacleSpawner::new(1);
        a.rearm(&tuning);
        let first = a.phase();
        a.rearm(&tuning);
        a.reseed(1);
        a.rearm(&tuning);
        assert_eq!(a.phase(), first);
    }
}
