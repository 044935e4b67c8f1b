//! Episode state and core simulation types
//!
//! All state that a `step` reads or writes lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::*;
use crate::tuning::Tuning;

/// Episode lifecycle. `reset` is the only way from Terminal back to Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EpisodePhase {
    #[default]
    Running,
    /// The cat crashed; the state is frozen until the next reset
    Terminal,
}

/// The player's cat. Horizontal position never changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            x: PLAYER_X,
            y: ((FIELD_H - PLAYER_H) / 2.0).floor(),
            width: PLAYER_W,
            height: PLAYER_H,
        }
    }
}

impl Player {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Lowest valid top edge
    pub fn max_y(&self) -> f32 {
        FIELD_H - self.height
    }

    /// Move vertically by `dy` and clamp to the canvas
    pub fn shift(&mut self, dy: f32) {
        self.y = (self.y + dy).clamp(0.0, self.max_y());
    }
}

/// Obstacle kinds and their placement rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Sits on the floor line
    Pumpkin,
    /// Appears at any height
    Ghost,
    /// Flies along the elevated flight line
    Bat,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [
        ObstacleKind::Pumpkin,
        ObstacleKind::Ghost,
        ObstacleKind::Bat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObstacleKind::Pumpkin => "pumpkin",
            ObstacleKind::Ghost => "ghost",
            ObstacleKind::Bat => "bat",
        }
    }

    pub fn is_grounded(&self) -> bool {
        matches!(self, ObstacleKind::Pumpkin)
    }

    pub fn is_flying(&self) -> bool {
        matches!(self, ObstacleKind::Bat)
    }
}

/// An obstacle scrolling from right to left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    /// Top-left corner; `y` is fixed for the obstacle's lifetime
    pub pos: Vec2,
    pub size: Vec2,
    pub alive: bool,
}

impl Obstacle {
    pub fn new(id: u32, kind: ObstacleKind, pos: Vec2, size: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            size,
            alive: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    /// Scroll left by `dx`; the obstacle dies once fully past the left edge
    pub fn advance(&mut self, dx: f32) {
        self.pos.x -= dx;
        if self.is_off_screen() {
            self.alive = false;
        }
    }

    pub fn is_off_screen(&self) -> bool {
        self.pos.x + self.size.x < 0.0
    }
}

/// Normalized agent observation (every component in `[0, 1]`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Player top edge / canvas height
    pub player_y: f32,
    /// Gap between the player's right edge and the next obstacle, / canvas width
    pub obstacle_distance: f32,
    /// Next obstacle's top edge / canvas height (0 when there is none)
    pub obstacle_y: f32,
    /// Game speed normalized over the tuning range
    pub speed: f32,
}

impl Observation {
    /// Number of floats in the observation vector
    pub const LEN: usize = 4;

    pub fn as_array(&self) -> [f32; Self::LEN] {
        [
            self.player_y,
            self.obstacle_distance,
            self.obstacle_y,
            self.speed,
        ]
    }
}

impl From<Observation> for [f32; Observation::LEN] {
    fn from(obs: Observation) -> Self {
        obs.as_array()
    }
}

/// Complete per-episode state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    pub player: Player,
    /// Sorted by `pos.x` ascending, which is also spawn order
    pub obstacles: Vec<Obstacle>,
    pub speed: f32,
    pub score: f64,
    /// Frames survived this episode
    pub frame: u64,
    pub phase: EpisodePhase,
    next_id: u32,
}

impl EpisodeState {
    /// Fresh episode: centered cat, no obstacles, minimum speed
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            player: Player::default(),
            obstacles: Vec::new(),
            speed: tuning.speed_min,
            score: 0.0,
            frame: 0,
            phase: EpisodePhase::Running,
            next_id: 1,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == EpisodePhase::Terminal
    }

    /// Allocate a new obstacle ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append an obstacle and return its ID
    pub fn spawn_obstacle(&mut self, kind: ObstacleKind, pos: Vec2, size: Vec2) -> u32 {
        let id = self.next_entity_id();
        self.obstacles.push(Obstacle::new(id, kind, pos, size));
        id
    }

    /// Raise speed by the per-frame growth (plus boost when accelerating), capped
    pub fn advance_speed(&mut self, accelerate: bool, tuning: &Tuning) {
        let mut delta = tuning.speed_growth_per_frame;
        if accelerate {
            delta += tuning.accelerate_boost;
        }
        self.speed = (self.speed + delta).min(tuning.speed_max);
    }

    /// Nearest upcoming obstacle: first alive one at or ahead of the player,
    /// falling back to the first alive one.
    pub fn next_obstacle(&self) -> Option<&Obstacle> {
        let mut alive = self.obstacles.iter().filter(|o| o.alive);
        let first = alive.clone().next();
        alive.find(|o| o.pos.x >= self.player.x).or(first)
    }

    /// Build the normalized observation vector for the current state
    pub fn observation(&self, tuning: &Tuning) -> Observation {
        let (obstacle_distance, obstacle_y) = match self.next_obstacle() {
            Some(obstacle) => {
                let gap = obstacle.pos.x - self.player.rect().right();
                (
                    gap.clamp(0.0, FIELD_W) / FIELD_W,
                    (obstacle.pos.y / FIELD_H).clamp(0.0, 1.0),
                )
            }
            None => (1.0, 0.0),
        };

        Observation {
            player_y: (self.player.y / FIELD_H).clamp(0.0, 1.0),
            obstacle_distance,
            obstacle_y,
            speed: tuning.speed_fraction(self.speed),
        }
    }
}
