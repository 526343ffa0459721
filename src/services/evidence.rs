//! Per-cycle decisions, each a single threshold test on a single signal.

use crate::models::config::TemplateSpec;
use crate::models::observation::{Observation, TextRead};
use crate::models::roi::Roi;
use crate::services::ocr::parse_capture_chance;
use crate::services::perception::Perception;

pub const YOUR_TURN: &str = "your turn";
pub const READY_TO_TRAIN: &str = "ready to train";
pub const OKAY: &str = "okay";
pub const CONTINUE: &str = "continue";

/// Battle start as seen from the farm loop: OCR of the turn card
pub fn is_battle_starting(perception: &Perception, observation: &Observation, turn_card: &Roi) -> bool {
    let text = perception.read_text(observation, turn_card, Some("turn_card_area_farm.png"));
    let decision = perception.fuzzy(&text, YOUR_TURN);

    tracing::debug!(
        "OCR result for turn card (farm): {:?}, similarity with '{}': {:.2}",
        text.as_str(),
        YOUR_TURN,
        decision.ratio
    );
    decision.matched
}

/// Whether an OCR'd enemy name is the configured target (case-insensitive)
pub fn is_target_creature(perception: &Perception, name: &TextRead, target: &str) -> bool {
    let decision = perception.fuzzy(name, &target.trim().to_lowercase());

    tracing::debug!(
        "Enemy name {:?} vs target {:?}: similarity {:.2}",
        name.as_str(),
        target,
        decision.ratio
    );
    decision.matched
}

/// Capture chance in percent; unreadable means 0
pub fn capture_chance(perception: &Perception, observation: &Observation, region: &Roi) -> u32 {
    let text = perception.read_text(observation, region, Some("capture_percentage_area.png"));
    let chance = parse_capture_chance(text.as_str());

    tracing::debug!("Capture chance OCR {:?} -> {}%", text.as_str(), chance);
    chance
}

/// OCR a region and fuzzy-compare it with a phrase
pub fn region_reads(
    perception: &Perception,
    observation: &Observation,
    region: &Roi,
    expected: &str,
    artifact: &str,
) -> bool {
    let text = perception.read_text(observation, region, Some(artifact));
    let decision = perception.fuzzy(&text, expected);

    tracing::debug!(
        "OCR result for {}: {:?}, similarity with '{}': {:.2}",
        artifact,
        text.as_str(),
        expected,
        decision.ratio
    );
    decision.matched
}

/// Fast-path turn detection against the cached turn card reference
pub fn is_your_turn(perception: &Perception, observation: &Observation, turn_card: &TemplateSpec) -> bool {
    perception
        .match_template(observation, turn_card)
        .is_some_and(|m| m.is_positive(turn_card.threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roi::Point;
    use crate::services::perception::testing::*;
    use std::path::Path;

    const TURN_CARD: Roi = Roi::new(10, 80, 36, 6);
    const CAPTURE: Roi = Roi::new(50, 5, 8, 4);

    fn setup(dir: &Path) -> (ScriptedScreen, ScriptedOcr, Perception) {
        let screen = ScriptedScreen::default();
        let ocr = ScriptedOcr::default();
        let perception = Perception::new(
            Box::new(screen.clone()),
            Box::new(ocr.clone()),
            dir.to_path_buf(),
            0.7,
        );
        screen.push(blank_screen(120, 100));
        (screen, ocr, perception)
    }

    #[test]
    fn test_battle_starting_on_noisy_turn_card() {
        let dir = temp_dir("evidence-turn");
        let (_screen, ocr, perception) = setup(&dir);
        ocr.set(&TURN_CARD, &["It's your turn!"]);

        let obs = perception.capture().unwrap();
        assert!(is_battle_starting(&perception, &obs, &TURN_CARD));
        assert!(dir.join("turn_card_area_farm.png").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_battle_not_starting_on_other_text() {
        let dir = temp_dir("evidence-no-turn");
        let (_screen, ocr, perception) = setup(&dir);
        ocr.set(&TURN_CARD, &["enemy turn..."]);

        let obs = perception.capture().unwrap();
        assert!(!is_battle_starting(&perception, &obs, &TURN_CARD));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_target_creature_ignores_case() {
        let dir = temp_dir("evidence-target");
        let (_screen, _ocr, perception) = setup(&dir);

        let read = TextRead::from_raw("Light Bludger");
        assert!(is_target_creature(&perception, &read, "Light Bludger"));
        assert!(is_target_creature(&perception, &TextRead::from_raw("light bludqer"), "Light Bludger"));
        assert!(!is_target_creature(&perception, &TextRead::from_raw("flameling"), "Light Bludger"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_capture_chance_reads_digits() {
        let dir = temp_dir("evidence-capture");
        let (_screen, ocr, perception) = setup(&dir);
        ocr.set(&CAPTURE, &["87%"]);

        let obs = perception.capture().unwrap();
        assert_eq!(capture_chance(&perception, &obs, &CAPTURE), 87);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_capture_chance_without_digits_is_zero() {
        let dir = temp_dir("evidence-capture-zero");
        let (_screen, ocr, perception) = setup(&dir);

        for noise in ["", "%", "--", "capture"] {
            ocr.set(&CAPTURE, &[noise]);
            let obs = perception.capture().unwrap();
            assert_eq!(capture_chance(&perception, &obs, &CAPTURE), 0);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_your_turn_by_template() {
        let dir = temp_dir("evidence-template");
        let card = textured(36, 6, 7);
        let template = write_template(&dir, "turn.png", &card);

        let screen = ScriptedScreen::default();
        screen.push(with_patch(blank_screen(120, 100), &card, Point::new(10, 80)));
        screen.push(blank_screen(120, 100));
        let perception = Perception::new(Box::new(screen), Box::new(ScriptedOcr::default()), dir.clone(), 0.7);

        let with_card = perception.capture().unwrap();
        assert!(is_your_turn(&perception, &with_card, &template));

        let without_card = perception.capture().unwrap();
        assert!(!is_your_turn(&perception, &without_card, &template));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
