//! Rendering module
//!
//! The scene is drawn in software onto a 200x150 canvas, then uploaded to a
//! WebGPU texture and scaled up by a whole-number factor with nearest filtering.

pub mod canvas;
pub mod font;
pub mod pixel_pipeline;
pub mod scene;
pub mod viewport;

use thiserror::Error;

pub use canvas::{Canvas, Rgba};
pub use pixel_pipeline::PixelRenderState;
pub use scene::{Backdrop, Hud, draw_scene};
pub use viewport::Viewport;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
