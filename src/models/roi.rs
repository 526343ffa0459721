use serde::{Deserialize, Serialize};

/// Screen point in logical (pointer) coordinates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Region of Interest bound to one semantic reading (turn card, enemy name, ...)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Create a new ROI from coordinates
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Validate ROI dimensions
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Center of the region, integer-divided like the click targets in game UI
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Convert logical coordinates to physical pixels
    /// On 125% scale: logical 100x100 → physical 125x125
    pub fn scaled(&self, scale_factor: f64) -> Roi {
        Roi {
            x: (self.x as f64 * scale_factor) as i32,
            y: (self.y as f64 * scale_factor) as i32,
            width: (self.width as f64 * scale_factor) as u32,
            height: (self.height as f64 * scale_factor) as u32,
        }
    }

    /// Clamp the region to an image of the given size.
    /// Returns (x, y, width, height) in unsigned pixels, or None when nothing is left.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = (self.x as i64 + self.width as i64).min(image_width as i64);
        let y1 = (self.y as i64 + self.height as i64).min(image_height as i64);
        let x0 = (self.x as i64).max(0);
        let y0 = (self.y as i64).max(0);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}
