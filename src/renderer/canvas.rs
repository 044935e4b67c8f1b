//! Low-resolution RGBA software canvas
//!
//! Everything is drawn here at the internal resolution, then uploaded as a
//! texture and scaled up with nearest filtering.

/// RGBA8 color
pub type Rgba = [u8; 4];

/// Opaque color from components
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgba {
    [r, g, b, 255]
}

/// Linear blend `a -> b` by `t` in `[0, 1]`
pub fn mix(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), lerp(a[3], b[3])]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgb(0, 0, 0); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Set one pixel; out-of-bounds writes are dropped
    pub fn put(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Fill an axis-aligned rectangle, clipped to the canvas
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let stride = self.width as usize;
        for row in y0 as usize..y1 as usize {
            self.pixels[row * stride + x0 as usize..row * stride + x1 as usize].fill(color);
        }
    }

    /// Fill a disc centered on (`cx`, `cy`)
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgba) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Fill the ellipse inscribed in the `w` x `h` box at (`x`, `y`)
    pub fn fill_ellipse(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        if w <= 0 || h <= 0 {
            return;
        }
        let rx = w as f32 / 2.0;
        let ry = h as f32 / 2.0;
        for py in 0..h {
            let ny = (py as f32 + 0.5 - ry) / ry;
            for px in 0..w {
                let nx = (px as f32 + 0.5 - rx) / rx;
                if nx * nx + ny * ny <= 1.0 {
                    self.put(x + px, y + py, color);
                }
            }
        }
    }

    /// Raw RGBA bytes, row-major, for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}
