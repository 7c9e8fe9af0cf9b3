//! Image representation for the transfer pipeline.

use glam::Vec2;

/// Perceptual image. Always stored as row-major CIE-Lab f32 triplets.
#[derive(Debug, Clone, PartialEq)]
pub struct LabImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel data as `[L, a, b]`, row-major.
    pub pixels: Vec<[f32; 3]>,
}

impl LabImage {
    /// An image filled with a single Lab value.
    pub fn filled(width: u32, height: u32, lab: [f32; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![lab; width as usize * height as usize],
        }
    }

    /// Linear index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width as usize + x
    }

    /// Lightness at `(x, y)`.
    #[inline]
    pub fn lightness(&self, x: usize, y: usize) -> f32 {
        self.pixels[self.index(x, y)][0]
    }

    /// Chroma `(a, b)` at `(x, y)`.
    #[inline]
    pub fn chroma(&self, x: usize, y: usize) -> Vec2 {
        let [_, a, b] = self.pixels[self.index(x, y)];
        Vec2::new(a, b)
    }

    /// Overwrite the chroma at `(x, y)`, leaving lightness untouched.
    #[inline]
    pub fn set_chroma(&mut self, x: usize, y: usize, chroma: Vec2) {
        let idx = self.index(x, y);
        self.pixels[idx][1] = chroma.x;
        self.pixels[idx][2] = chroma.y;
    }

    /// The smaller of width and height.
    pub fn min_side(&self) -> usize {
        self.width.min(self.height) as usize
    }
}
