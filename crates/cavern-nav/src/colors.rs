//! Trail colors handed out to navigations.

use serde::{Deserialize, Serialize};

/// RGB color, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

impl Color {
    /// Create a color.
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Default trail palette.
pub const DEFAULT_PALETTE: [Color; 8] = [
    Color::new(0.90, 0.20, 0.20),
    Color::new(0.20, 0.60, 0.95),
    Color::new(0.25, 0.80, 0.30),
    Color::new(0.95, 0.75, 0.15),
    Color::new(0.70, 0.35, 0.90),
    Color::new(0.10, 0.80, 0.80),
    Color::new(0.95, 0.50, 0.10),
    Color::new(0.85, 0.85, 0.85),
];

/// Palette service shared by all navigations of an engine.
///
/// Returned colors are handed out again before unused palette entries; once
/// the palette is exhausted it wraps around.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorPool {
    palette: Vec<Color>,
    returned: Vec<Color>,
    next: usize,
}

impl ColorPool {
    /// Pool over a custom palette. An empty palette falls back to the default.
    #[must_use]
    pub fn new(palette: Vec<Color>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.to_vec()
        } else {
            palette
        };
        Self {
            palette,
            returned: Vec::new(),
            next: 0,
        }
    }

    /// Take a color.
    pub fn acquire(&mut self) -> Color {
        if let Some(color) = self.returned.pop() {
            return color;
        }
        let color = self.palette[self.next % self.palette.len()];
        self.next += 1;
        color
    }

    /// Give a color back for reuse.
    pub fn release(&mut self, color: Color) {
        self.returned.push(color);
    }

    /// Number of palette entries.
    #[must_use]
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }
}

impl Default for ColorPool {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_in_palette_order() {
        let mut pool = ColorPool::default();
        assert_eq!(pool.acquire(), DEFAULT_PALETTE[0]);
        assert_eq!(pool.acquire(), DEFAULT_PALETTE[1]);
    }

    #[test]
    fn test_returned_colors_come_first() {
        let mut pool = ColorPool::default();
        let first = pool.acquire();
        let _second = pool.acquire();
        pool.release(first);
        assert_eq!(pool.acquire(), first);
        assert_eq!(pool.acquire(), DEFAULT_PALETTE[2]);
    }

    #[test]
    fn test_wraps_around() {
        let mut pool = ColorPool::new(vec![Color::new(1.0, 0.0, 0.0), Color::new(0.0, 1.0, 0.0)]);
        pool.acquire();
        pool.acquire();
        assert_eq!(pool.acquire(), Color::new(1.0, 0.0, 0.0));
        assert_eq!(ColorPool::new(Vec::new()).palette_len(), DEFAULT_PALETTE.len());
    }
}
