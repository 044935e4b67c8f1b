//! Host session: fixed-timestep driver around a [`Simulation`]
//!
//! Converts variable frame times into whole simulation steps, restarts
//! finished episodes on request and keeps the persistent best score.

use crate::consts::*;
use crate::highscores::{HighScore, HighScoreStore};
use crate::sim::{Action, Observation, Simulation, StepOutcome};

/// Longest frame time fed to the accumulator (tab switches, breakpoints)
const MAX_FRAME_DT: f32 = 0.1;

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    EpisodeEnded {
        episode: u32,
        score: f64,
        frames: u64,
        new_record: bool,
    },
    Restarted {
        episode: u32,
    },
}

/// What one `update` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    /// Steps in which the simulation was running (excludes game-over frames)
    pub advanced: u32,
    pub events: Vec<SessionEvent>,
}

/// Owns the simulation, the score store and the frame accumulator
pub struct Session<S: HighScoreStore> {
    sim: Simulation,
    store: S,
    best: HighScore,
    accumulator: f32,
    last_outcome: Option<StepOutcome>,
    /// 1-based number of the current episode
    episode: u32,
}

impl<S: HighScoreStore> Session<S> {
    /// Wrap a simulation; the stored best score is loaded once here
    pub fn new(sim: Simulation, store: S) -> Self {
        let best = HighScore::new(store.load_high_score());
        Self {
            sim,
            store,
            best,
            accumulator: 0.0,
            last_outcome: None,
            episode: 1,
        }
    }

    /// Advance by a wall-clock delta, running as many fixed steps as fit
    pub fn update(&mut self, dt: f32, action: Action, restart: bool) -> FrameReport {
        self.update_with(dt, restart, |_| action)
    }

    /// Like `update`, but asks `choose` for a fresh action before every step
    pub fn update_with(
        &mut self,
        dt: f32,
        restart: bool,
        mut choose: impl FnMut(&Observation) -> Action,
    ) -> FrameReport {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut report = FrameReport::default();
        let mut restart = restart;
        while self.accumulator >= SIM_DT && report.steps < MAX_SUBSTEPS {
            let action = choose(&self.sim.observation());
            if !self.sim.is_done() && !restart {
                report.advanced += 1;
            }
            if let Some(event) = self.frame(action, restart) {
                report.events.push(event);
            }
            // Restart requests are one-shot
            restart = false;
            self.accumulator -= SIM_DT;
            report.steps += 1;
        }
        if report.steps == MAX_SUBSTEPS {
            // Drop the backlog rather than trying to catch up
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        report
    }

    /// Run exactly one frame.
    ///
    /// While the episode is over, Accelerate or an explicit restart begins the
    /// next one; any other input leaves the game-over screen up.
    pub fn frame(&mut self, action: Action, restart: bool) -> Option<SessionEvent> {
        if self.sim.is_done() {
            if restart || action == Action::Accelerate {
                return Some(self.restart());
            }
            return None;
        }
        if restart {
            return Some(self.restart());
        }

        let outcome = self.sim.step(action);
        self.last_outcome = Some(outcome);
        if outcome.done {
            return Some(self.finish_episode());
        }
        None
    }

    fn finish_episode(&mut self) -> SessionEvent {
        let episode = self.sim.episode();
        let score = episode.score;
        let frames = episode.frame;
        let new_record = self.best.record(score);

        log::info!(
            "Episode {} over: score {:.1} after {} frames (best {:.1})",
            self.episode,
            score,
            frames,
            self.best.best()
        );
        if let Err(e) = self.store.save_high_score(self.best.best()) {
            log::warn!("Failed to save high score: {}", e);
        }

        SessionEvent::EpisodeEnded {
            episode: self.episode,
            score,
            frames,
            new_record,
        }
    }

    /// Begin a new episode immediately
    pub fn restart(&mut self) -> SessionEvent {
        self.sim.reset();
        self.last_outcome = None;
        self.episode += 1;
        log::debug!("Episode {} started", self.episode);
        SessionEvent::Restarted {
            episode: self.episode,
        }
    }

    /// Persisted best score (updated at episode end)
    pub fn high_score(&self) -> f64 {
        self.best.best()
    }

    /// Best score including the episode in progress, for display
    pub fn live_high_score(&self) -> f64 {
        self.best.best().max(self.sim.episode().score)
    }

    pub fn observation(&self) -> Observation {
        self.sim.observation()
    }

    pub fn last_outcome(&self) -> Option<StepOutcome> {
        self.last_outcome
    }

    pub fn episode_number(&self) -> u32 {
        self.episode
    }

    pub fn is_game_over(&self) -> bool {
        self.sim.is_done()
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
