//! Data-driven game balance
//!
//! Every gameplay constant the simulation reads lives in [`Tuning`]. The defaults
//! give the classic arcade feel; a JSON file may override any subset.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Rejected tuning values
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning value `{0}` must be finite")]
    NotFinite(&'static str),
    #[error("speed range is empty: min {min}, max {max}")]
    SpeedRange { min: f32, max: f32 },
    #[error("tuning value `{0}` must be positive")]
    NotPositive(&'static str),
    #[error("spawn cooldown range is empty: {min}..={max}")]
    CooldownRange { min: u32, max: u32 },
    #[error("obstacle size range {min}..={max} does not fit the canvas")]
    SizeRange { min: u32, max: u32 },
    #[error("flight line {0} leaves no room for obstacles")]
    FlightLine(f32),
    #[error("all obstacle kind weights are zero")]
    KindWeights,
    #[error("obstacle kind weights overflow when summed")]
    KindWeightsOverflow,
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Relative spawn weights per obstacle kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindWeights {
    pub pumpkin: u32,
    pub ghost: u32,
    pub bat: u32,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            pumpkin: 4,
            ghost: 3,
            bat: 3,
        }
    }
}

impl KindWeights {
    /// Sum of all weights, `None` if it does not fit in a `u32`
    pub fn total(&self) -> Option<u32> {
        self.pumpkin
            .checked_add(self.ghost)?
            .checked_add(self.bat)
    }
}

/// Gameplay tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Game speed at the start of every episode
    pub speed_min: f32,
    /// Game speed cap
    pub speed_max: f32,
    /// Speed added every frame regardless of input
    pub speed_growth_per_frame: f32,
    /// Extra speed added on frames where the action is Accelerate
    pub accelerate_boost: f32,
    /// Obstacle scroll distance per frame at speed 1.0
    pub scroll_px_per_frame: f32,
    /// Vertical player displacement per Up/Down frame
    pub player_step_px: f32,

    /// Spawn cooldown is drawn from this range (frames at speed 1.0)
    pub spawn_cooldown_min: u32,
    pub spawn_cooldown_max: u32,
    /// Cooldown never drops below this many frames
    pub spawn_cooldown_floor: u32,
    /// Minimum spacing between obstacles expressed in frames of travel
    pub spawn_min_gap_frames: f32,
    /// Random extra distance beyond the right edge for new obstacles
    pub spawn_jitter_px: u32,

    /// Obstacle side lengths are drawn from `obstacle_min_size..=obstacle_max_size`
    pub obstacle_min_size: u32,
    pub obstacle_max_size: u32,
    /// Top edge of flying obstacles
    pub flight_line_y: f32,
    pub kind_weights: KindWeights,

    /// Reward per surviving frame (also the score increment)
    pub survive_reward: f64,
    /// Reward on the crash frame
    pub crash_penalty: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            speed_min: 1.0,
            speed_max: 3.0,
            speed_growth_per_frame: 0.001,
            accelerate_boost: 0.02,
            scroll_px_per_frame: 1.2,
            player_step_px: 2.0,

            spawn_cooldown_min: 45,
            spawn_cooldown_max: 110,
            spawn_cooldown_floor: 20,
            spawn_min_gap_frames: 20.0,
            spawn_jitter_px: 20,

            obstacle_min_size: 8,
            obstacle_max_size: 14,
            flight_line_y: PATH_MARGIN_TOP as f32,
            kind_weights: KindWeights::default(),

            survive_reward: 0.1,
            crash_penalty: -100.0,
        }
    }
}

impl Tuning {
    /// Check every invariant the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        let floats = [
            ("speed_min", self.speed_min),
            ("speed_max", self.speed_max),
            ("speed_growth_per_frame", self.speed_growth_per_frame),
            ("accelerate_boost", self.accelerate_boost),
            ("scroll_px_per_frame", self.scroll_px_per_frame),
            ("player_step_px", self.player_step_px),
            ("spawn_min_gap_frames", self.spawn_min_gap_frames),
            ("flight_line_y", self.flight_line_y),
        ];
        for (name, value) in floats {
            if !value.is_finite() {
                return Err(TuningError::NotFinite(name));
            }
        }
        if !self.survive_reward.is_finite() {
            return Err(TuningError::NotFinite("survive_reward"));
        }
        if !self.crash_penalty.is_finite() {
            return Err(TuningError::NotFinite("crash_penalty"));
        }

        if self.speed_min <= 0.0 {
            return Err(TuningError::NotPositive("speed_min"));
        }
        if self.speed_max <= self.speed_min {
            return Err(TuningError::SpeedRange {
                min: self.speed_min,
                max: self.speed_max,
            });
        }
        if self.speed_growth_per_frame < 0.0 {
            return Err(TuningError::NotPositive("speed_growth_per_frame"));
        }
        if self.accelerate_boost < 0.0 {
            return Err(TuningError::NotPositive("accelerate_boost"));
        }
        if self.scroll_px_per_frame <= 0.0 {
            return Err(TuningError::NotPositive("scroll_px_per_frame"));
        }
        if self.player_step_px <= 0.0 {
            return Err(TuningError::NotPositive("player_step_px"));
        }
        if self.spawn_min_gap_frames < 0.0 {
            return Err(TuningError::NotPositive("spawn_min_gap_frames"));
        }

        if self.spawn_cooldown_min > self.spawn_cooldown_max {
            return Err(TuningError::CooldownRange {
                min: self.spawn_cooldown_min,
                max: self.spawn_cooldown_max,
            });
        }
        if self.spawn_cooldown_floor == 0 {
            return Err(TuningError::NotPositive("spawn_cooldown_floor"));
        }

        if self.obstacle_min_size == 0
            || self.obstacle_min_size > self.obstacle_max_size
            || self.obstacle_max_size >= INTERNAL_H
        {
            return Err(TuningError::SizeRange {
                min: self.obstacle_min_size,
                max: self.obstacle_max_size,
            });
        }
        if self.flight_line_y < 0.0 || self.flight_line_y > FIELD_H - self.obstacle_max_size as f32
        {
            return Err(TuningError::FlightLine(self.flight_line_y));
        }
        match self.kind_weights.total() {
            None => return Err(TuningError::KindWeightsOverflow),
            Some(0) => return Err(TuningError::KindWeights),
            Some(_) => {}
        }

        Ok(())
    }

    /// Parse and validate a JSON tuning document (missing fields keep defaults)
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a JSON tuning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Horizontal gap (px) the spawner keeps free ahead of a new obstacle.
    ///
    /// Grows with speed so the time between obstacles stays reactable.
    pub fn min_spawn_gap(&self, speed: f32) -> f32 {
        self.spawn_min_gap_frames * self.scroll_px_per_frame * speed
    }

    /// Speed normalized to `[0, 1]` over the configured range
    pub fn speed_fraction(&self, speed: f32) -> f32 {
        crate::normalize(speed, self.speed_min, self.speed_max)
    }
}
