//! Scene drawing onto the internal canvas
//!
//! The backdrop (stars, moon, clouds, fence, left-edge decorations) is
//! purely cosmetic and owns its own RNG, so it never perturbs the
//! simulation's spawn stream.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::canvas::{Canvas, Rgba, mix, rgb};
use super::font::{draw_text, draw_text_centered, text_width};
use crate::consts::*;
use crate::sim::{EpisodeState, Obstacle, ObstacleKind};

const NIGHT: Rgba = rgb(10, 8, 18);
const PATH: Rgba = rgb(30, 30, 40);
const MOON: Rgba = rgb(250, 240, 190);
const CLOUD_FAR: Rgba = rgb(200, 200, 220);
const CLOUD_NEAR: Rgba = rgb(230, 230, 245);
const FENCE: Rgba = rgb(50, 20, 10);
const PUMPKIN: Rgba = rgb(239, 125, 14);
const GHOST: Rgba = rgb(200, 200, 255);
const BAT: Rgba = rgb(70, 0, 120);
const STEM: Rgba = rgb(40, 90, 20);
const CAT: Rgba = rgb(18, 18, 18);
const CAT_EYES: Rgba = rgb(200, 230, 60);
const HUD_TEXT: Rgba = rgb(220, 220, 220);
const HUD_HIGH: Rgba = rgb(250, 200, 80);
const BANNER: Rgba = rgb(255, 100, 100);

const STAR_COUNT: usize = 50;
const STAR_TWINKLE_CHANCE: f32 = 0.02;
const MOON_RADIUS: i32 = 7;
const FENCE_SPACING: i32 = 16;
const DECO_SIZE: i32 = 10;
const DECO_BOB_AMP: f32 = 3.0;

pub fn obstacle_color(kind: ObstacleKind) -> Rgba {
    match kind {
        ObstacleKind::Pumpkin => PUMPKIN,
        ObstacleKind::Ghost => GHOST,
        ObstacleKind::Bat => BAT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Star {
    x: i32,
    y: i32,
    size: i32,
    brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Decoration {
    kind: ObstacleKind,
    base_y: f32,
    phase: f32,
    bob_speed: f32,
}

impl Decoration {
    fn y(&self) -> i32 {
        let corridor_top = PATH_MARGIN_TOP as f32;
        let corridor_bottom = (INTERNAL_H - PATH_MARGIN_BOTTOM) as f32 - DECO_SIZE as f32;
        (self.base_y + DECO_BOB_AMP * self.phase.sin())
            .round()
            .clamp(corridor_top, corridor_bottom) as i32
    }
}

/// Animated background layers
#[derive(Debug, Clone)]
pub struct Backdrop {
    rng: Pcg32,
    stars: Vec<Star>,
    moon_x: f32,
    moon_y: f32,
    cloud_near: f32,
    cloud_far: f32,
    star_scroll: f32,
    fence_scroll: f32,
    decorations: Vec<Decoration>,
}

impl Backdrop {
    pub fn new(seed: u64) -> Self {
        let mut backdrop = Self {
            rng: Pcg32::seed_from_u64(seed),
            stars: Vec::with_capacity(STAR_COUNT),
            moon_x: 0.0,
            moon_y: 0.0,
            cloud_near: 0.0,
            cloud_far: 0.0,
            star_scroll: 0.0,
            fence_scroll: 0.0,
            decorations: Vec::new(),
        };
        backdrop.reset();
        backdrop
    }

    /// New sky for a new episode
    pub fn reset(&mut self) {
        let w = INTERNAL_W as i32;
        self.cloud_near = 0.0;
        self.cloud_far = 0.0;
        self.star_scroll = 0.0;
        self.fence_scroll = 0.0;
        self.moon_x = self.rng.random_range((w * 6 / 10)..=(w - 10)) as f32;
        self.moon_y = self.rng.random_range(10..=25) as f32;

        let sky_height = (PATH_MARGIN_TOP as i32 - 6).max(8);
        self.stars.clear();
        for _ in 0..STAR_COUNT {
            let x = self.rng.random_range(0..w);
            let y = self.rng.random_range(2..=sky_height);
            let size = if self.rng.random_range(0..4) == 0 { 2 } else { 1 };
            let brightness = self.rng.random_range(170..=240);
            self.stars.push(Star {
                x,
                y,
                size,
                brightness,
            });
        }

        let corridor_top = PATH_MARGIN_TOP as i32;
        let corridor_h = INTERNAL_H as i32 - PATH_MARGIN_BOTTOM as i32 - corridor_top;
        let kinds = [ObstacleKind::Pumpkin, ObstacleKind::Bat, ObstacleKind::Ghost];
        let spacing = corridor_h / (kinds.len() as i32 + 1);
        self.decorations = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| Decoration {
                kind,
                base_y: (corridor_top + (i as i32 + 1) * spacing - DECO_SIZE / 2) as f32,
                phase: self.rng.random::<f32>() * std::f32::consts::TAU,
                bob_speed: match kind {
                    ObstacleKind::Pumpkin => 0.035,
                    ObstacleKind::Bat => 0.055,
                    ObstacleKind::Ghost => 0.045,
                },
            })
            .collect();
    }

    /// Advance one simulation frame. `speed_fraction` is the normalized game
    /// speed, `speed` the raw one.
    pub fn advance(&mut self, speed_fraction: f32, speed: f32) {
        let factor = 1.0 + 0.4 * speed_fraction;
        self.cloud_near += 0.1 * factor;
        self.cloud_far += 0.025 * factor;
        self.star_scroll += 0.01 * factor;
        self.moon_x -= 0.02 * factor;
        if self.moon_x < -10.0 {
            self.moon_x = FIELD_W + 10.0;
        }

        for star in &mut self.stars {
            if self.rng.random::<f32>() < STAR_TWINKLE_CHANCE {
                let delta = [-20, -10, 10, 20][self.rng.random_range(0..4)];
                star.brightness = (star.brightness as i32 + delta).clamp(140, 255) as u8;
            }
        }

        for deco in &mut self.decorations {
            deco.phase += deco.bob_speed;
        }

        self.fence_scroll += 0.2 * speed * (1.0 + speed_fraction);
        if self.fence_scroll >= FIELD_W {
            self.fence_scroll -= FIELD_W;
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        let w = INTERNAL_W as i32;
        canvas.clear(NIGHT);

        let offset = self.star_scroll as i32 % w;
        for star in &self.stars {
            let x = (star.x - offset).rem_euclid(w);
            let b = star.brightness;
            canvas.fill_rect(x, star.y, star.size, star.size, rgb(b, b, b.saturating_add(20)));
        }

        // Crescent: a night-colored disc bites the moon
        let (mx, my) = (self.moon_x as i32, self.moon_y as i32);
        canvas.fill_circle(mx, my, MOON_RADIUS, MOON);
        canvas.fill_circle(mx + 3, my - 1, MOON_RADIUS - 1, NIGHT);

        draw_cloud_layer(canvas, self.cloud_far, 60, 0, 20, 16, 4, CLOUD_FAR);
        draw_cloud_layer(canvas, self.cloud_near, 80, 10, 24, 20, 8, CLOUD_NEAR);

        let path_top = PATH_MARGIN_TOP as i32;
        let path_bottom = INTERNAL_H as i32 - PATH_MARGIN_BOTTOM as i32;
        canvas.fill_rect(0, path_top, w, path_bottom - path_top, PATH);

        let offset = self.fence_scroll as i32 % FENCE_SPACING;
        let mut x = -offset;
        while x < w {
            canvas.fill_rect(x, path_bottom - 4, 3, 4, FENCE);
            x += FENCE_SPACING;
        }

        for deco in &self.decorations {
            draw_creature(canvas, deco.kind, 1, deco.y(), DECO_SIZE, DECO_SIZE);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_cloud_layer(
    canvas: &mut Canvas,
    scroll: f32,
    spacing: i32,
    dx: i32,
    y: i32,
    w: i32,
    h: i32,
    color: Rgba,
) {
    let offset = scroll as i32 % spacing;
    let mut cx = -offset;
    while cx < INTERNAL_W as i32 {
        let x = cx + dx;
        canvas.fill_ellipse(x, y, w, h, color);
        canvas.fill_ellipse(x - w / 3, y + 1, w, h, color);
        canvas.fill_ellipse(x + w / 3, y + 2, w, h, color);
        cx += spacing;
    }
}

/// Obstacle sprite drawn from primitives, filling its collision box
fn draw_creature(canvas: &mut Canvas, kind: ObstacleKind, x: i32, y: i32, w: i32, h: i32) {
    let color = obstacle_color(kind);
    match kind {
        ObstacleKind::Pumpkin => {
            canvas.fill_ellipse(x, y + 1, w, h - 1, color);
            canvas.fill_rect(x + w / 2 - 1, y, 2, 2, STEM);
            // Carved eyes
            canvas.put(x + w / 3, y + h / 2, NIGHT);
            canvas.put(x + w - 1 - w / 3, y + h / 2, NIGHT);
        }
        ObstacleKind::Ghost => {
            canvas.fill_ellipse(x, y, w, h * 2 / 3 + 1, color);
            canvas.fill_rect(x, y + h / 3, w, h - h / 3, color);
            // Ragged hem
            let mut hx = x + 1;
            while hx < x + w {
                canvas.put(hx, y + h - 1, PATH);
                hx += 3;
            }
            canvas.put(x + w / 3, y + h / 3, NIGHT);
            canvas.put(x + w - 1 - w / 3, y + h / 3, NIGHT);
        }
        ObstacleKind::Bat => {
            canvas.fill_rect(x + w / 3, y + h / 4, w - 2 * (w / 3), h / 2, color);
            canvas.fill_rect(x, y, w / 3, h / 2, color);
            canvas.fill_rect(x + w - w / 3, y, w / 3, h / 2, color);
            canvas.fill_rect(x + w / 3, y + h * 3 / 4, w - 2 * (w / 3), h / 4, color);
        }
    }
}

fn draw_obstacle(canvas: &mut Canvas, obstacle: &Obstacle) {
    draw_creature(
        canvas,
        obstacle.kind,
        obstacle.pos.x.round() as i32,
        obstacle.pos.y.round() as i32,
        obstacle.size.x.round() as i32,
        obstacle.size.y.round() as i32,
    );
}

fn draw_cat(canvas: &mut Canvas, episode: &EpisodeState, frame: u64) {
    let rect = episode.player.rect();
    let (x, y) = (rect.left().round() as i32, rect.top().round() as i32);
    let (w, h) = (rect.size.x as i32, rect.size.y as i32);

    // Three-frame shimmer on the body
    let shade = 10 + (frame / 5 % 3) as u8 * 8;
    canvas.fill_rect(x, y + 2, w, h - 2, mix(CAT, rgb(shade, shade, shade), 0.5));
    canvas.fill_rect(x + 2, y, 2, 2, CAT);
    canvas.fill_rect(x + w - 4, y, 2, 2, CAT);
    canvas.put(x + w - 3, y + 4, CAT_EYES);
    canvas.put(x + w - 6, y + 4, CAT_EYES);
}

/// Overlay values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hud {
    pub score: f64,
    pub high_score: f64,
    pub game_over: bool,
    pub new_record: bool,
    pub demo: bool,
    pub fps: Option<u32>,
}

fn draw_hud(canvas: &mut Canvas, hud: &Hud) {
    let w = INTERNAL_W as i32;
    draw_text(canvas, 2, 2, &format!("SCORE {:.1}", hud.score), HUD_TEXT);
    let high = format!("HI {:.1}", hud.high_score);
    draw_text(canvas, w - text_width(&high) - 2, 2, &high, HUD_HIGH);

    let bottom = INTERNAL_H as i32 - 7;
    if hud.demo {
        draw_text(canvas, 2, bottom, "DEMO", HUD_HIGH);
    }
    if let Some(fps) = hud.fps {
        let text = format!("FPS {}", fps);
        draw_text(canvas, w - text_width(&text) - 2, bottom, &text, HUD_TEXT);
    }

    if hud.game_over {
        let y = INTERNAL_H as i32 / 2 - 5;
        draw_text_centered(canvas, y, "GAME OVER", BANNER);
        if hud.new_record {
            draw_text_centered(canvas, y + 8, "NEW HIGH SCORE!", HUD_HIGH);
        }
        draw_text_centered(canvas, y + 16, "PRESS SPACE OR R", BANNER);
    }
}

/// Draw one complete frame
pub fn draw_scene(canvas: &mut Canvas, backdrop: &Backdrop, episode: &EpisodeState, hud: &Hud) {
    backdrop.draw(canvas);
    for obstacle in episode.obstacles.iter().filter(|o| o.alive) {
        draw_obstacle(canvas, obstacle);
    }
    draw_cat(canvas, episode, episode.frame);
    draw_hud(canvas, hud);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use glam::Vec2;

    #[test]
    fn test_backdrop_is_seeded() {
        let mut a = Backdrop::new(8);
        let mut b = Backdrop::new(8);
        for _ in 0..100 {
            a.advance(0.5, 2.0);
            b.advance(0.5, 2.0);
        }
        assert_eq!(a.stars, b.stars);
        assert_eq!(a.moon_x, b.moon_x);
        assert_eq!(a.stars.len(), STAR_COUNT);
    }

    #[test]
    fn test_stars_stay_in_sky_and_range() {
        let mut backdrop = Backdrop::new(1);
        for _ in 0..2000 {
            backdrop.advance(1.0, 3.0);
        }
        for star in &backdrop.stars {
            assert!(star.y < PATH_MARGIN_TOP as i32);
            assert!((140..=255).contains(&(star.brightness as i32)));
        }
    }

    #[test]
    fn test_fence_scroll_wraps() {
        let mut backdrop = Backdrop::new(2);
        for _ in 0..10_000 {
            backdrop.advance(1.0, 3.0);
        }
        assert!(backdrop.fence_scroll >= 0.0 && backdrop.fence_scroll < FIELD_W);
        assert!(backdrop.moon_x >= -10.0 && backdrop.moon_x <= FIELD_W + 10.0);
    }

    #[test]
    fn test_decorations_bob_inside_corridor() {
        let mut backdrop = Backdrop::new(3);
        for _ in 0..500 {
            backdrop.advance(0.0, 1.0);
            for deco in &backdrop.decorations {
                let y = deco.y();
                assert!(y >= PATH_MARGIN_TOP as i32);
                assert!(y + DECO_SIZE <= (INTERNAL_H - PATH_MARGIN_BOTTOM) as i32);
            }
        }
    }

    #[test]
    fn test_scene_draws_obstacles_and_cat() {
        let tuning = Tuning::default();
        let mut episode = EpisodeState::new(&tuning);
        episode.spawn_obstacle(ObstacleKind::Bat, Vec2::new(120.0, 40.0), Vec2::splat(12.0));
        let backdrop = Backdrop::new(4);
        let mut canvas = Canvas::new(INTERNAL_W, INTERNAL_H);
        draw_scene(&mut canvas, &backdrop, &episode, &Hud::default());

        // Bat wing corner
        assert_eq!(canvas.get(120, 40), Some(BAT));
        // Cat ear
        let cat = episode.player.rect();
        assert_eq!(canvas.get(cat.left() as i32 + 2, cat.top() as i32), Some(CAT));
    }

    #[test]
    fn test_game_over_banner() {
        let tuning = Tuning::default();
        let episode = EpisodeState::new(&tuning);
        let backdrop = Backdrop::new(5);
        let mut plain = Canvas::new(INTERNAL_W, INTERNAL_H);
        let mut over = Canvas::new(INTERNAL_W, INTERNAL_H);
        draw_scene(&mut plain, &backdrop, &episode, &Hud::default());
        draw_scene(
            &mut over,
            &backdrop,
            &episode,
            &Hud {
                game_over: true,
                ..Default::default()
            },
        );
        let banner = over.as_bytes().chunks(4).filter(|p| **p == BANNER[..]).count();
        assert!(banner > 0);
        assert_ne!(plain, over);
    }
}
