//! Post-battle sequence: Continue, and the scripted training flow when the
//! game offers it.
//!
//! The sleeps follow the game's animations at the reference layout. They
//! are fixed per step rather than configurable.

use crate::models::config::BotConfig;
use crate::models::roi::{Point, Roi};
use crate::services::evidence::{self, CONTINUE, OKAY, READY_TO_TRAIN};
use crate::services::perception::Perception;
use crate::services::pointer::{click_at, Pointer};
use std::time::Duration;
use tokio::time::sleep;

/// Before the first capture, while the result screen appears
pub const SETTLE: Duration = Duration::from_secs(1);
/// After Continue when training follows
pub const AFTER_TRAINING_CONTINUE: Duration = Duration::from_secs(2);
pub const AFTER_TRAIN_ICON: Duration = Duration::from_secs(1);
pub const AFTER_SECOND_MISCRIT: Duration = Duration::from_secs(1);
pub const AFTER_TRAIN_NOW: Duration = Duration::from_secs(5);
pub const AFTER_PLATINUM_CONFIRM: Duration = Duration::from_secs(3);
/// After either confirm-continue button
pub const AFTER_CONFIRM_CONTINUE: Duration = Duration::from_secs(1);
pub const AFTER_TRAILING_CONTINUE: Duration = Duration::from_secs(1);
pub const AFTER_TRAILING_OKAY: Duration = Duration::from_secs(1);
pub const AFTER_CLOSE_PANEL: Duration = Duration::from_millis(500);
/// After Continue when there is nothing to train
pub const AFTER_PLAIN_CONTINUE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBattleOutcome {
    /// No Continue button on screen; nothing was clicked
    ContinueNotFound,
    /// Continue clicked, no training offered
    Continued,
    /// Continue clicked and the training sequence ran
    Trained,
}

/// Runs the post-battle steps against one perception/pointer pair
pub struct EndBattle<'a> {
    config: &'a BotConfig,
    perception: &'a Perception,
    pointer: &'a mut dyn Pointer,
    platinum_training: bool,
}

impl<'a> EndBattle<'a> {
    pub fn new(
        config: &'a BotConfig,
        perception: &'a Perception,
        pointer: &'a mut dyn Pointer,
        platinum_training: bool,
    ) -> Self {
        Self {
            config,
            perception,
            pointer,
            platinum_training,
        }
    }

    fn glide(&self) -> Duration {
        Duration::from_millis(self.config.timing.pointer_glide_ms)
    }

    pub async fn run(&mut self) -> Result<EndBattleOutcome, String> {
        sleep(SETTLE).await;

        let observation = self.perception.capture()?;
        let Some(continue_at) = self
            .perception
            .locate(&observation, &self.config.templates.continue_button)
        else {
            tracing::info!("Continue button not found.");
            return Ok(EndBattleOutcome::ContinueNotFound);
        };

        let ready = evidence::region_reads(
            self.perception,
            &observation,
            &self.config.regions.ready_to_train,
            READY_TO_TRAIN,
            "ready_to_train_area.png",
        );

        if ready {
            self.train(continue_at).await?;
            tracing::info!("Training sequence complete. Returning to farming loop.");
            return Ok(EndBattleOutcome::Trained);
        }

        tracing::info!(
            "Continue button found at ({}, {}). Clicking once...",
            continue_at.x,
            continue_at.y
        );
        self.click(continue_at, AFTER_PLAIN_CONTINUE).await?;
        self.click_if_reads(self.config.regions.okay_final, OKAY, "okay2_area.png", Duration::ZERO)
            .await?;

        Ok(EndBattleOutcome::Continued)
    }

    async fn train(&mut self, continue_at: Point) -> Result<(), String> {
        let clicks = self.config.clicks.clone();
        let regions = self.config.regions.clone();

        tracing::info!("Ready to train. Continue at ({}, {})", continue_at.x, continue_at.y);
        self.click(continue_at, AFTER_TRAINING_CONTINUE).await?;
        self.click_if_reads(regions.okay_after_train, OKAY, "okay_area_after_train.png", Duration::ZERO)
            .await?;

        self.click(clicks.train_icon, AFTER_TRAIN_ICON).await?;
        self.click(clicks.second_miscrit, AFTER_SECOND_MISCRIT).await?;
        self.click(clicks.train_now, AFTER_TRAIN_NOW).await?;

        if self.platinum_training {
            self.click(clicks.platinum_confirm, AFTER_PLATINUM_CONFIRM).await?;
            self.click(clicks.platinum_continue, AFTER_CONFIRM_CONTINUE).await?;
        } else {
            self.click(clicks.standard_continue, AFTER_CONFIRM_CONTINUE).await?;
        }

        self.click_if_reads(
            regions.continue_after_train,
            CONTINUE,
            "continue_button_area.png",
            AFTER_TRAILING_CONTINUE,
        )
        .await?;

        let observation = self.perception.capture()?;
        if let Some(okay) = self.perception.locate(&observation, &self.config.templates.okay) {
            tracing::info!("'Okay' detected with template matching and clicked.");
            self.click(okay, AFTER_TRAILING_OKAY).await?;
        }

        self.click(clicks.close_panel, AFTER_CLOSE_PANEL).await?;
        self.click_if_reads(regions.okay_final, OKAY, "okay2_area.png", Duration::ZERO)
            .await?;

        Ok(())
    }

    async fn click(&mut self, at: Point, then_wait: Duration) -> Result<(), String> {
        let glide = self.glide();
        click_at(&mut *self.pointer, at, glide).await?;
        sleep(then_wait).await;
        Ok(())
    }

    /// Fresh capture, OCR `region`, click its center when it reads `phrase`
    async fn click_if_reads(
        &mut self,
        region: Roi,
        phrase: &str,
        artifact: &str,
        then_wait: Duration,
    ) -> Result<bool, String> {
        let observation = self.perception.capture()?;
        if !evidence::region_reads(self.perception, &observation, &region, phrase, artifact) {
            return Ok(false);
        }

        let center = region.center();
        tracing::info!("'{}' detected. Clicking at ({}, {})", phrase, center.x, center.y);
        self.click(center, then_wait).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::battle_engine::testing::BattleScene;
    use crate::services::perception::testing::ScriptedOcr;
    use crate::services::pointer::testing::RecordingPointer;
    use tokio::time::Instant;

    async fn run_end_battle(
        scene: &BattleScene,
        ocr: &ScriptedOcr,
        pointer: &RecordingPointer,
        platinum: bool,
    ) -> (EndBattleOutcome, Duration) {
        let perception = scene.perception(ocr);
        let mut pointer = pointer.clone();
        let started = Instant::now();
        let outcome = EndBattle::new(&scene.config, &perception, &mut pointer, platinum)
            .run()
            .await
            .unwrap();
        (outcome, started.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_continue_is_a_no_op() {
        let scene = BattleScene::new("end-none");
        scene.screen.push(scene.frame(&[]));
        let pointer = RecordingPointer::default();

        let (outcome, elapsed) = run_end_battle(&scene, &ScriptedOcr::default(), &pointer, false).await;

        assert_eq!(outcome, EndBattleOutcome::ContinueNotFound);
        assert!(pointer.events.lock().is_empty());
        assert!(elapsed >= SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_continue_then_okay() {
        let scene = BattleScene::new("end-plain");
        scene.screen.push(scene.frame(&["continue"]));
        let ocr = ScriptedOcr::default();
        ocr.set(&scene.config.regions.okay_final, &["Okay"]);
        let pointer = RecordingPointer::default();

        let (outcome, elapsed) = run_end_battle(&scene, &ocr, &pointer, false).await;

        assert_eq!(outcome, EndBattleOutcome::Continued);
        assert_eq!(
            pointer.clicks(),
            vec![BattleScene::CONTINUE_AT, Point::new(46, 72)]
        );
        assert!(elapsed >= SETTLE + AFTER_PLAIN_CONTINUE);
        assert!(scene.dir.join("screenshots").join("okay2_area.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_continue_without_okay() {
        let scene = BattleScene::new("end-plain-no-okay");
        scene.screen.push(scene.frame(&["continue"]));
        let pointer = RecordingPointer::default();

        let (outcome, _) = run_end_battle(&scene, &ScriptedOcr::default(), &pointer, false).await;

        assert_eq!(outcome, EndBattleOutcome::Continued);
        assert_eq!(pointer.clicks(), vec![BattleScene::CONTINUE_AT]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_standard_training_sequence() {
        let scene = BattleScene::new("end-train");
        scene.screen.push(scene.frame(&["continue", "okay"]));
        let ocr = ScriptedOcr::default();
        ocr.set(&scene.config.regions.ready_to_train, &["Ready to Train!"]);
        ocr.set(&scene.config.regions.okay_after_train, &["okay"]);
        ocr.set(&scene.config.regions.continue_after_train, &["Continue"]);
        ocr.set(&scene.config.regions.okay_final, &["okay"]);
        let pointer = RecordingPointer::default();

        let (outcome, elapsed) = run_end_battle(&scene, &ocr, &pointer, false).await;

        let clicks = &scene.config.clicks;
        assert_eq!(outcome, EndBattleOutcome::Trained);
        assert_eq!(
            pointer.clicks(),
            vec![
                BattleScene::CONTINUE_AT,
                Point::new(45, 52),
                clicks.train_icon,
                clicks.second_miscrit,
                clicks.train_now,
                clicks.standard_continue,
                Point::new(69, 52),
                BattleScene::OKAY_AT,
                clicks.close_panel,
                Point::new(46, 72),
            ]
        );

        let expected = SETTLE
            + AFTER_TRAINING_CONTINUE
            + AFTER_TRAIN_ICON
            + AFTER_SECOND_MISCRIT
            + AFTER_TRAIN_NOW
            + AFTER_CONFIRM_CONTINUE
            + AFTER_TRAILING_CONTINUE
            + AFTER_TRAILING_OKAY
            + AFTER_CLOSE_PANEL;
        assert!(elapsed >= expected, "{:?} < {:?}", elapsed, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_platinum_training_skips_absent_prompts() {
        let scene = BattleScene::new("end-platinum");
        scene.screen.push(scene.frame(&["continue"]));
        let ocr = ScriptedOcr::default();
        ocr.set(&scene.config.regions.ready_to_train, &["ready to train"]);
        let pointer = RecordingPointer::default();

        let (outcome, elapsed) = run_end_battle(&scene, &ocr, &pointer, true).await;

        let clicks = &scene.config.clicks;
        assert_eq!(outcome, EndBattleOutcome::Trained);
        assert_eq!(
            pointer.clicks(),
            vec![
                BattleScene::CONTINUE_AT,
                clicks.train_icon,
                clicks.second_miscrit,
                clicks.train_now,
                clicks.platinum_confirm,
                clicks.platinum_continue,
                clicks.close_panel,
            ]
        );
        assert!(elapsed >= SETTLE + AFTER_TRAIN_NOW + AFTER_PLATINUM_CONFIRM);
        assert_eq!(ocr.calls_for(&scene.config.regions.okay_after_train), 1);
        assert_eq!(ocr.calls_for(&scene.config.regions.okay_final), 1);
    }
}
