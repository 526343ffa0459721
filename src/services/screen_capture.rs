use crate::models::observation::Observation;
use image::DynamicImage;
use xcap::Monitor;

/// Source of full-screen observations
pub trait ScreenSource {
    /// Take one capture. Errors are fatal for the current cycle only.
    fn capture(&self) -> Result<Observation, String>;
}

/// Screen capture service using xcap
pub struct ScreenCapture {
    monitor: Monitor,
    scale_factor: f64,
}

impl ScreenCapture {
    /// Create a new screen capture instance using the primary monitor
    pub fn new() -> Result<Self, String> {
        let monitor = Monitor::all()
            .map_err(|e| format!("Failed to get monitors: {}", e))?
            .into_iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .ok_or("No primary monitor found")?;

        // xcap returns physical pixels, so we need to detect the scale factor
        // On macOS Retina, the scale factor is typically 2.0
        let scale_factor = monitor.scale_factor().unwrap_or(1.0) as f64;

        tracing::debug!(
            "🖥️  Screen capture initialized: {}x{} physical, scale factor {}",
            monitor.width().unwrap_or(0),
            monitor.height().unwrap_or(0),
            scale_factor
        );

        Ok(Self {
            monitor,
            scale_factor,
        })
    }
}

impl ScreenSource for ScreenCapture {
    fn capture(&self) -> Result<Observation, String> {
        let rgba_image = self
            .monitor
            .capture_image()
            .map_err(|e| format!("Failed to capture screen: {}", e))?;

        Ok(Observation::new(
            DynamicImage::ImageRgba8(rgba_image),
            self.scale_factor,
        ))
    }
}
