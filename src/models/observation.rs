use crate::models::roi::{Point, Roi};
use image::{DynamicImage, RgbImage};

/// One screen capture, taken once per poll cycle and never mutated.
///
/// `raw` keeps the capture as delivered (used for OCR crops and saved
/// artifacts), `frame` is the alpha-free RGB copy every template is matched
/// against. Region and click coordinates are logical; the capture is in
/// physical pixels, `scale_factor` converts between the two.
pub struct Observation {
    raw: DynamicImage,
    frame: RgbImage,
    scale_factor: f64,
}

impl Observation {
    pub fn new(raw: DynamicImage, scale_factor: f64) -> Self {
        let frame = raw.to_rgb8();
        Self {
            raw,
            frame,
            scale_factor,
        }
    }

    pub fn raw(&self) -> &DynamicImage {
        &self.raw
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Crop a logical region out of the raw capture (clamped to the screen)
    pub fn crop(&self, roi: &Roi) -> Option<DynamicImage> {
        let physical = roi.scaled(self.scale_factor);
        let (x, y, width, height) = physical.clamp_to(self.raw.width(), self.raw.height())?;
        Some(self.raw.crop_imm(x, y, width, height))
    }

    /// Convert a physical pixel position back to pointer coordinates
    pub fn to_logical(&self, x: u32, y: u32) -> Point {
        Point::new(
            (x as f64 / self.scale_factor) as i32,
            (y as f64 / self.scale_factor) as i32,
        )
    }
}

/// Best template position found in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Normalized correlation, -1.0..=1.0
    pub score: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MatchResult {
    /// Center of the matched area in physical pixels
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// A match counts only when the score is strictly above the threshold
    pub fn is_positive(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

/// OCR output, lowercased and trimmed. Empty when nothing was read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRead(String);

impl TextRead {
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TextRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Similarity of an OCR read against an expected phrase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyDecision {
    pub ratio: f64,
    pub matched: bool,
}
