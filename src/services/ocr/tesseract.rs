use super::engine::OcrEngine;
use image::DynamicImage;
use tesseract::{PageSegMode, Tesseract};

const LANGUAGE: &str = "eng";

/// Tesseract OCR engine implementation
pub struct TesseractEngine {
    // Tesseract instance will be created per-call for thread safety
}

impl TesseractEngine {
    /// Create a new Tesseract engine instance
    pub fn new() -> Result<Self, String> {
        if !Self::is_available() {
            return Err("Tesseract not available on system".to_string());
        }

        Ok(Self {})
    }

    /// Configure Tesseract for single line recognition (game UI)
    fn configure_single_line(mut tesseract: Tesseract) -> Tesseract {
        tesseract.set_page_seg_mode(PageSegMode::PsmSingleLine);
        tesseract
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, String> {
        // Tesseract takes encoded image bytes
        let mut img_bytes: Vec<u8> = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut img_bytes), image::ImageFormat::Png)
            .map_err(|e| format!("Failed to encode image: {}", e))?;

        let tesseract = Tesseract::new(None, Some(LANGUAGE))
            .map_err(|e| format!("Failed to create Tesseract instance: {}", e))?;
        let tesseract = Self::configure_single_line(tesseract);

        let text = tesseract
            .set_image_from_mem(&img_bytes)
            .map_err(|e| format!("Failed to set image: {}", e))?
            .get_text()
            .map_err(|e| format!("Failed to recognize text: {}", e))?;

        Ok(text)
    }

    fn is_available() -> bool {
        Tesseract::new(None, Some(LANGUAGE)).is_ok()
    }
}
