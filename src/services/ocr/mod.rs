pub mod engine;
pub mod fuzzy;
pub mod parser;
pub mod template_matcher;
pub mod tesseract;

// Re-export main types
pub use engine::OcrEngine;
pub use fuzzy::fuzzy_match;
pub use parser::parse_capture_chance;
pub use tesseract::TesseractEngine;
