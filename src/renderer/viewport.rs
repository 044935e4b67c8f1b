//! Integer-scale letterboxing of the internal canvas onto the surface

/// Destination rectangle on the surface, in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Surface pixels per canvas pixel
    pub scale: f32,
}

impl Viewport {
    /// Largest whole-number scale that fits, centered with black bars.
    /// Surfaces smaller than the canvas fall back to a fractional fit.
    pub fn letterbox(surface_w: u32, surface_h: u32, canvas_w: u32, canvas_h: u32) -> Self {
        let sw = surface_w.max(1) as f32;
        let sh = surface_h.max(1) as f32;
        let cw = canvas_w.max(1) as f32;
        let ch = canvas_h.max(1) as f32;

        let fit = (sw / cw).min(sh / ch);
        let scale = if fit >= 1.0 { fit.floor() } else { fit };

        let width = cw * scale;
        let height = ch * scale;
        Self {
            x: ((sw - width) / 2.0).floor(),
            y: ((sh - height) / 2.0).floor(),
            width,
            height,
            scale,
        }
    }

    /// Map a surface point to canvas coordinates (None outside the picture)
    pub fn to_canvas(&self, px: f32, py: f32) -> Option<(f32, f32)> {
        let x = (px - self.x) / self.scale;
        let y = (py - self.y) / self.scale;
        let inside = px >= self.x
            && py >= self.y
            && px < self.x + self.width
            && py < self.y + self.height;
        inside.then_some((x, y))
    }
}
