//! Built-in policies and headless rollouts
//!
//! External agents drive [`Simulation`](crate::Simulation) directly through
//! `reset`/`step`. The policies here exist for the headless binary, for the
//! web demo mode and for smoke-testing the environment.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::highscores::HighScoreStore;
use crate::session::{Session, SessionEvent};
use crate::settings::PolicyKind;
use crate::sim::{Action, Observation};

/// Chooses one action per frame from an observation
pub trait Policy {
    fn act(&mut self, observation: &Observation) -> Action;

    fn name(&self) -> &'static str;
}

impl<F: FnMut(&Observation) -> Action> Policy for F {
    fn act(&mut self, observation: &Observation) -> Action {
        self(observation)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}

/// Uniformly random actions from a seeded stream
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: Pcg32,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &Observation) -> Action {
        Action::ALL[self.rng.random_range(0..Action::COUNT)]
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Dodges the next obstacle when it is close and in the cat's row
#[derive(Debug, Clone)]
pub struct DodgePolicy {
    /// React when the next obstacle is nearer than this (fraction of width)
    pub react_distance: f32,
    /// Extra vertical clearance (fraction of height)
    pub clearance: f32,
}

impl Default for DodgePolicy {
    fn default() -> Self {
        Self {
            react_distance: 0.35,
            clearance: 0.04,
        }
    }
}

impl DodgePolicy {
    /// Largest obstacle the spawner produces with default tuning, normalized
    const OBSTACLE_H: f32 = 14.0 / FIELD_H;
    const PLAYER_H_NORM: f32 = PLAYER_H / FIELD_H;
}

impl Policy for DodgePolicy {
    fn act(&mut self, obs: &Observation) -> Action {
        if obs.obstacle_distance > self.react_distance {
            return Action::Noop;
        }

        let cat_top = obs.player_y - self.clearance;
        let cat_bottom = obs.player_y + Self::PLAYER_H_NORM + self.clearance;
        let obstacle_bottom = obs.obstacle_y + Self::OBSTACLE_H;
        if obstacle_bottom < cat_top || obs.obstacle_y > cat_bottom {
            return Action::Noop;
        }

        let max_y = 1.0 - Self::PLAYER_H_NORM;
        let obstacle_center = obs.obstacle_y + Self::OBSTACLE_H / 2.0;
        let cat_center = obs.player_y + Self::PLAYER_H_NORM / 2.0;
        let room_above = obs.obstacle_y;
        let room_below = 1.0 - obstacle_bottom;

        // Head for the side with more room, unless pinned against that edge
        let go_up = if obs.player_y <= 0.0 {
            false
        } else if obs.player_y >= max_y {
            true
        } else if (obstacle_center - cat_center).abs() < 0.02 {
            room_above > room_below
        } else {
            obstacle_center > cat_center
        };

        if go_up { Action::Up } else { Action::Down }
    }

    fn name(&self) -> &'static str {
        "dodge"
    }
}

/// Build the policy a [`PolicyKind`] names
pub fn make_policy(kind: PolicyKind, seed: u64) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
        PolicyKind::Dodge => Box::new(DodgePolicy::default()),
    }
}

/// One finished rollout episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    pub score: f64,
    pub frames: u64,
    /// False when the episode was cut off at `max_steps`
    pub crashed: bool,
}

/// Aggregate over a batch of episodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolloutSummary {
    pub episodes: Vec<EpisodeStats>,
    /// Persisted best score after the batch
    pub high_score: f64,
}

impl RolloutSummary {
    pub fn best(&self) -> f64 {
        self.episodes
            .iter()
            .map(|e| e.score)
            .fold(0.0, f64::max)
    }

    pub fn mean(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        self.episodes.iter().map(|e| e.score).sum::<f64>() / self.episodes.len() as f64
    }

    pub fn total_frames(&self) -> u64 {
        self.episodes.iter().map(|e| e.frames).sum()
    }
}

/// Play `episodes` full episodes as fast as possible (no frame pacing).
///
/// Episodes that reach `max_steps` frames (0 = unlimited) are cut off; only
/// crashed episodes count toward the stored best score. A cut-off run can
/// therefore score higher than the returned `high_score`, which then lags
/// behind `RolloutSummary::best`.
pub fn run_episodes<S: HighScoreStore>(
    session: &mut Session<S>,
    policy: &mut dyn Policy,
    episodes: u32,
    max_steps: u64,
) -> RolloutSummary {
    let mut summary = RolloutSummary::default();
    log::info!("Running {} episode(s) with the {} policy", episodes, policy.name());

    for _ in 0..episodes {
        if session.is_game_over() || session.sim().episode().frame > 0 {
            session.restart();
        }

        let stats = loop {
            let observation = session.observation();
            let action = policy.act(&observation);
            if let Some(SessionEvent::EpisodeEnded { score, frames, .. }) =
                session.frame(action, false)
            {
                break EpisodeStats {
                    score,
                    frames,
                    crashed: true,
                };
            }

            let episode = session.sim().episode();
            if max_steps > 0 && episode.frame >= max_steps {
                log::info!("Episode cut off at {} frames", episode.frame);
                break EpisodeStats {
                    score: episode.score,
                    frames: episode.frame,
                    crashed: false,
                };
            }
        };
        summary.episodes.push(stats);
    }

    summary.high_score = session.high_score();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::MemoryStore;
    use crate::sim::Simulation;

    fn obs(player_y: f32, distance: f32, obstacle_y: f32) -> Observation {
        Observation {
            player_y,
            obstacle_distance: distance,
            obstacle_y,
            speed: 0.0,
        }
    }

    #[test]
    fn test_random_policy_is_seeded() {
        let mut a = RandomPolicy::new(11);
        let mut b = RandomPolicy::new(11);
        let o = Observation::default();
        let xs: Vec<_> = (0..64).map(|_| a.act(&o)).collect();
        let ys: Vec<_> = (0..64).map(|_| b.act(&o)).collect();
        assert_eq!(xs, ys);
        assert!(Action::ALL.iter().all(|act| xs.contains(act)));
    }

    #[test]
    fn test_dodge_ignores_far_or_clear() {
        let mut policy = DodgePolicy::default();
        assert_eq!(policy.act(&obs(0.5, 1.0, 0.0)), Action::Noop);
        assert_eq!(policy.act(&obs(0.5, 0.9, 0.5)), Action::Noop);
        // Close but well above the cat
        assert_eq!(policy.act(&obs(0.8, 0.1, 0.1)), Action::Noop);
    }

    #[test]
    fn test_dodge_moves_away() {
        let mut policy = DodgePolicy::default();
        // Obstacle slightly below the cat: go up
        assert_eq!(policy.act(&obs(0.4, 0.1, 0.45)), Action::Up);
        // Obstacle slightly above: go down
        assert_eq!(policy.act(&obs(0.5, 0.1, 0.42)), Action::Down);
        // Pinned at the top: only down helps
        assert_eq!(policy.act(&obs(0.0, 0.1, 0.02)), Action::Down);
    }

    #[test]
    fn test_closure_policy() {
        let mut always_up = |_: &Observation| Action::Up;
        assert_eq!(always_up.act(&Observation::default()), Action::Up);
    }

    #[test]
    fn test_run_episodes_crashes_and_records() {
        let mut session = Session::new(Simulation::new(21), MemoryStore::default());
        let mut policy = RandomPolicy::new(21);
        let summary = run_episodes(&mut session, &mut policy, 3, 0);

        assert_eq!(summary.episodes.len(), 3);
        assert!(summary.episodes.iter().all(|e| e.crashed));
        assert!((summary.high_score - summary.best()).abs() < 1e-9);
        assert_eq!(session.store().saves, 3);
        assert!(summary.mean() <= summary.best());
    }

    #[test]
    fn test_run_episodes_respects_max_steps() {
        let mut session = Session::new(Simulation::new(4), MemoryStore::default());
        let mut policy = DodgePolicy::default();
        let summary = run_episodes(&mut session, &mut policy, 2, 25);

        assert_eq!(summary.episodes.len(), 2);
        for episode in &summary.episodes {
            // Nothing can reach the cat within 25 frames
            assert!(!episode.crashed);
            assert_eq!(episode.frames, 25);
        }
        assert_eq!(summary.total_frames(), 50);
        assert_eq!(session.store().saves, 0);
        // Cut-off runs are reported but never become the stored best
        assert!((summary.best() - 2.5).abs() < 1e-9);
        assert_eq!(summary.high_score, 0.0);
    }
}
