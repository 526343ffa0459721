use crate::models::config::TemplateSpec;
use crate::models::observation::{FuzzyDecision, MatchResult, Observation, TextRead};
use crate::models::roi::{Point, Roi};
use crate::services::ocr::fuzzy::fuzzy_match;
use crate::services::ocr::template_matcher::{match_template, TemplateLibrary};
use crate::services::ocr::OcrEngine;
use crate::services::screen_capture::ScreenSource;
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Uniform recognition primitives over one capture device and one OCR engine
pub struct Perception {
    screen: Box<dyn ScreenSource>,
    ocr: Box<dyn OcrEngine>,
    templates: TemplateLibrary,
    debug_dir: PathBuf,
    fuzzy_threshold: f64,
}

impl Perception {
    pub fn new(
        screen: Box<dyn ScreenSource>,
        ocr: Box<dyn OcrEngine>,
        debug_dir: PathBuf,
        fuzzy_threshold: f64,
    ) -> Self {
        Self {
            screen,
            ocr,
            templates: TemplateLibrary::new(),
            debug_dir,
            fuzzy_threshold,
        }
    }

    /// Full-screen capture
    pub fn capture(&self) -> Result<Observation, String> {
        self.screen.capture()
    }

    /// OCR one region as a single line of text.
    ///
    /// The crop is written to the debug directory as `artifact` when given.
    /// Never fails: an off-screen region or an engine error reads as "".
    pub fn read_text(&self, observation: &Observation, roi: &Roi, artifact: Option<&str>) -> TextRead {
        let Some(crop) = observation.crop(roi) else {
            tracing::debug!("OCR region {:?} is off screen", roi);
            return TextRead::default();
        };

        if let Some(name) = artifact {
            self.save_artifact(&crop, name);
        }

        match self.ocr.recognize(&crop) {
            Ok(raw) => TextRead::from_raw(&raw),
            Err(e) => {
                tracing::debug!("❌ OCR failed for {:?}: {}", roi, e);
                TextRead::default()
            }
        }
    }

    /// Crop a region without reading it (used to capture new references)
    pub fn crop(&self, observation: &Observation, roi: &Roi) -> Option<DynamicImage> {
        observation.crop(roi)
    }

    /// Best match of a template, positive or not. None if the template is
    /// missing or larger than the screen.
    pub fn match_template(&self, observation: &Observation, template: &TemplateSpec) -> Option<MatchResult> {
        let image = self.templates.get(&template.path)?;
        match_template(observation.frame(), &image)
    }

    /// Pointer position of the template center when its match is positive
    pub fn locate(&self, observation: &Observation, template: &TemplateSpec) -> Option<Point> {
        let result = self.match_template(observation, template)?;

        tracing::debug!(
            "Template {} best match {:.2} at ({}, {})",
            template.path.display(),
            result.score,
            result.x,
            result.y
        );

        if !result.is_positive(template.threshold) {
            return None;
        }

        let (cx, cy) = result.center();
        Some(observation.to_logical(cx, cy))
    }

    /// Fuzzy comparison using the configured threshold
    pub fn fuzzy(&self, text: &TextRead, expected: &str) -> FuzzyDecision {
        fuzzy_match(text.as_str(), expected, self.fuzzy_threshold)
    }

    /// Whether a template is loadable (loads and caches it)
    pub fn has_template(&self, path: &Path) -> bool {
        self.templates.get(path).is_some()
    }

    /// Save a new reference image and use it for subsequent matches
    pub fn store_template(&self, path: &Path, image: &DynamicImage) -> Result<(), String> {
        self.templates.store(path, image)
    }

    fn save_artifact(&self, crop: &DynamicImage, name: &str) {
        // Diagnostics only; a failed write never affects the cycle
        if std::fs::create_dir_all(&self.debug_dir).is_ok() {
            crop.save(self.debug_dir.join(name)).ok();
        }
    }
}
