use image::DynamicImage;

/// OCR Engine trait - abstraction over the text recognizer
pub trait OcrEngine: Send + Sync {
    /// Recognize a single line of game UI text
    fn recognize(&self, image: &DynamicImage) -> Result<String, String>;

    /// Check if the OCR engine is available
    fn is_available() -> bool
    where
        Self: Sized;
}
