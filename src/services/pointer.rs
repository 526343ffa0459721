use crate::models::roi::Point;
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use std::time::Duration;
use tokio::time::sleep;

/// Intermediate moves when gliding to a target
const GLIDE_STEPS: u32 = 10;

/// Pointer injection primitive
pub trait Pointer {
    fn position(&mut self) -> Result<Point, String>;
    fn move_to(&mut self, point: Point) -> Result<(), String>;
    fn press(&mut self) -> Result<(), String>;
    fn release(&mut self) -> Result<(), String>;
    fn click(&mut self) -> Result<(), String>;
}

/// OS pointer via enigo
pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self, String> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| format!("Failed to connect to input device: {}", e))?;
        Ok(Self { enigo })
    }
}

impl Pointer for EnigoPointer {
    fn position(&mut self) -> Result<Point, String> {
        let (x, y) = self
            .enigo
            .location()
            .map_err(|e| format!("Failed to read pointer location: {}", e))?;
        Ok(Point::new(x, y))
    }

    fn move_to(&mut self, point: Point) -> Result<(), String> {
        self.enigo
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(|e| format!("Failed to move pointer: {}", e))
    }

    fn press(&mut self) -> Result<(), String> {
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(|e| format!("Failed to press button: {}", e))
    }

    fn release(&mut self) -> Result<(), String> {
        self.enigo
            .button(Button::Left, Direction::Release)
            .map_err(|e| format!("Failed to release button: {}", e))
    }

    fn click(&mut self) -> Result<(), String> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| format!("Failed to click: {}", e))
    }
}

/// Move the pointer to `target` over `glide`, in even steps
pub async fn glide_to(pointer: &mut dyn Pointer, target: Point, glide: Duration) -> Result<(), String> {
    if glide.is_zero() {
        return pointer.move_to(target);
    }

    // An unknown start position just means no visible travel
    let start = pointer.position().unwrap_or(target);
    let step_delay = glide / GLIDE_STEPS;

    for step in 1..=GLIDE_STEPS {
        let t = step as f64 / GLIDE_STEPS as f64;
        let point = Point::new(
            start.x + ((target.x - start.x) as f64 * t).round() as i32,
            start.y + ((target.y - start.y) as f64 * t).round() as i32,
        );
        pointer.move_to(point)?;
        sleep(step_delay).await;
    }

    Ok(())
}

/// Glide to `target` and left-click once
pub async fn click_at(pointer: &mut dyn Pointer, target: Point, glide: Duration) -> Result<(), String> {
    glide_to(pointer, target, glide).await?;
    pointer.click()
}
