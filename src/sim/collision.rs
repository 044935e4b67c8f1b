//! Axis-aligned collision detection
//!
//! Everything in the game is a rectangle in internal canvas coordinates
//! (y grows downward). Touching edges count as a hit.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::Obstacle;

/// Axis-aligned rectangle: top-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.pos.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }
}

/// Inclusive AABB overlap: rectangles that share an edge or corner collide.
#[inline]
pub fn collides(a: &Rect, b: &Rect) -> bool {
    a.left() <= b.right() && b.left() <= a.right() && a.top() <= b.bottom() && b.top() <= a.bottom()
}

/// Index of the first alive obstacle overlapping `player`, if any
pub fn first_collision(player: &Rect, obstacles: &[Obstacle]) -> Option<usize> {
    obstacles
        .iter()
        .position(|obstacle| obstacle.alive && collides(player, &obstacle.rect()))
}
