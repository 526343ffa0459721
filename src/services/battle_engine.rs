use crate::models::config::BotConfig;
use crate::models::observation::Observation;
use crate::models::roi::Point;
use crate::services::end_battle::{EndBattle, EndBattleOutcome};
use crate::services::evidence::{self, YOUR_TURN};
use crate::services::persistence::{EncounterCounter, Handoff, HandoffFile};
use crate::services::perception::Perception;
use crate::services::pointer::{click_at, Pointer};
use std::time::Duration;
use tokio::time::sleep;

/// Wait after clicking the capture button
pub const AFTER_CAPTURE: Duration = Duration::from_secs(2);
/// Wait after playing a move
pub const AFTER_MOVE: Duration = Duration::from_secs(2);
/// Poll interval when nothing is actionable
pub const IDLE_POLL: Duration = Duration::from_millis(50);
/// OCR poll interval while waiting for the first turn card
pub const BOOTSTRAP_POLL: Duration = Duration::from_millis(200);

/// Move played every turn
const FIRST_MOVE: usize = 0;

/// Evidence gathered from one capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnSignals {
    /// Set only for the target, above the capture threshold, with the
    /// button visible
    pub capture_button: Option<Point>,
    pub your_turn: bool,
    pub continue_visible: bool,
}

/// Exactly one of these fires per battle cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleAction {
    Capture(Point),
    Attack,
    Continue,
    Idle,
}

/// Priority: capture, then turn, then continue
pub fn choose_action(signals: &TurnSignals) -> BattleAction {
    if let Some(button) = signals.capture_button {
        BattleAction::Capture(button)
    } else if signals.your_turn {
        BattleAction::Attack
    } else if signals.continue_visible {
        BattleAction::Continue
    } else {
        BattleAction::Idle
    }
}

/// One battle, from the first turn to the post-battle Continue
pub struct BattleEngine {
    config: BotConfig,
    perception: Perception,
    pointer: Box<dyn Pointer>,
    handoff: Handoff,
    is_target: bool,
}

impl BattleEngine {
    pub fn new(config: BotConfig, perception: Perception, pointer: Box<dyn Pointer>) -> Self {
        let handoff = Handoff::from(&config.target);
        Self {
            config,
            perception,
            pointer,
            handoff,
            is_target: false,
        }
    }

    fn glide(&self) -> Duration {
        Duration::from_millis(self.config.timing.pointer_glide_ms)
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(self.config.timing.retry_backoff_secs)
    }

    /// Play the battle to its end. Faults along the way are logged and
    /// retried after the backoff; only the end of the battle returns.
    pub async fn run(&mut self) -> EndBattleOutcome {
        self.enter().await;

        if !self.perception.has_template(&self.config.templates.turn_card.path) {
            self.bootstrap_turn_card().await;
        }

        loop {
            match self.poll_cycle().await {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Error in battle loop: {}", e);
                    sleep(self.backoff()).await;
                }
            }
        }
    }

    /// Capture, retrying after the backoff until a frame comes back
    async fn capture_with_retry(&self) -> Observation {
        loop {
            match self.perception.capture() {
                Ok(observation) => return observation,
                Err(e) => {
                    tracing::error!("Error capturing battle screen: {}", e);
                    sleep(self.backoff()).await;
                }
            }
        }
    }

    /// Read the handoff, identify the enemy once and count target encounters.
    /// Returns whether the enemy is the target.
    pub async fn enter(&mut self) -> bool {
        let files = &self.config.files;
        self.handoff = HandoffFile::new(files).read_or(&self.config.target);
        let counter = EncounterCounter::new(&files.encounters);

        tracing::info!(
            "Loaded configuration - Target: {}, Platinum Training: {}",
            self.handoff.target,
            self.handoff.platinum_training
        );
        tracing::debug!("Target encounters so far: {}", counter.load());

        let observation = self.capture_with_retry().await;
        let enemy = self.perception.read_text(
            &observation,
            &self.config.regions.enemy_name,
            Some("enemy_name_area.png"),
        );
        tracing::info!("Enemy miscrit name detected: {}", enemy);

        self.is_target = evidence::is_target_creature(&self.perception, &enemy, &self.handoff.target);
        if self.is_target {
            match counter.increment() {
                Ok(count) => tracing::info!("Target miscrit encounters: {}", count),
                Err(e) => tracing::error!("Failed to save encounter counter: {}", e),
            }
        }

        self.is_target
    }

    /// OCR the turn card until it reads "your turn", then keep that crop as
    /// the turn-card template
    async fn bootstrap_turn_card(&mut self) {
        let region = self.config.regions.turn_card;
        let path = self.config.templates.turn_card.path.clone();

        loop {
            let observation = self.capture_with_retry().await;
            let text = self.perception.read_text(&observation, &region, None);
            let decision = self.perception.fuzzy(&text, YOUR_TURN);
            tracing::debug!(
                "OCR result for turn card (battle): {:?}, similarity with '{}': {:.2}",
                text.as_str(),
                YOUR_TURN,
                decision.ratio
            );

            if decision.matched {
                let Some(crop) = self.perception.crop(&observation, &region) else {
                    tracing::error!("Turn card region is off screen");
                    sleep(self.backoff()).await;
                    continue;
                };
                // A failed write still leaves the crop cached for this run
                match self.perception.store_template(&path, &crop) {
                    Ok(()) => tracing::info!("Saved turn card reference image to {}", path.display()),
                    Err(e) => tracing::warn!("{}; using the turn card from memory", e),
                }
                return;
            }

            tracing::debug!("Not in battle or not your turn. Retrying in {:?}...", BOOTSTRAP_POLL);
            sleep(BOOTSTRAP_POLL).await;
        }
    }

    /// Capture once and gather this cycle's evidence
    fn read_signals(&self) -> Result<TurnSignals, String> {
        let observation = self.perception.capture()?;
        let templates = &self.config.templates;

        let your_turn = evidence::is_your_turn(&self.perception, &observation, &templates.turn_card);
        let continue_visible = self
            .perception
            .locate(&observation, &templates.continue_button)
            .is_some();

        let mut capture_button = None;
        if self.is_target {
            let chance = evidence::capture_chance(
                &self.perception,
                &observation,
                &self.config.regions.capture_percent,
            );
            if chance > self.config.thresholds.capture_chance {
                tracing::info!("Target miscrit found and capture chance is {}%!", chance);
                capture_button = self.perception.locate(&observation, &templates.capture_button);
                if capture_button.is_none() {
                    tracing::warn!("Capture button not found!");
                }
            }
        }

        Ok(TurnSignals {
            capture_button,
            your_turn,
            continue_visible,
        })
    }

    /// Returns the end-of-battle outcome once Continue was handled
    pub async fn poll_cycle(&mut self) -> Result<Option<EndBattleOutcome>, String> {
        let signals = self.read_signals()?;
        let glide = self.glide();

        match choose_action(&signals) {
            BattleAction::Capture(button) => {
                tracing::info!("Clicking capture button at ({}, {})", button.x, button.y);
                click_at(self.pointer.as_mut(), button, glide).await?;
                sleep(AFTER_CAPTURE).await;
            }
            BattleAction::Attack => {
                let slot = self.config.clicks.attack_slots[FIRST_MOVE];
                tracing::info!("It's your turn! Clicking move {} at ({}, {})", FIRST_MOVE + 1, slot.x, slot.y);
                click_at(self.pointer.as_mut(), slot, glide).await?;
                sleep(AFTER_MOVE).await;
            }
            BattleAction::Continue => {
                tracing::info!("Continue button detected. Ending battle...");
                let outcome = EndBattle::new(
                    &self.config,
                    &self.perception,
                    self.pointer.as_mut(),
                    self.handoff.platinum_training,
                )
                .run()
                .await?;
                return Ok(Some(outcome));
            }
            BattleAction::Idle => sleep(IDLE_POLL).await,
        }

        Ok(None)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::models::config::{BotConfig, TemplateSpec};
    use crate::models::roi::{Point, Roi};
    use crate::services::perception::testing::*;
    use crate::services::perception::Perception;
    use image::RgbImage;
    use std::path::PathBuf;

    /// 120x100 battle screen with every region at a distinct size
    pub struct BattleScene {
        pub dir: PathBuf,
        pub config: BotConfig,
        pub screen: ScriptedScreen,
        pub turn_card: RgbImage,
        pub continue_button: RgbImage,
        pub capture_button: RgbImage,
        pub okay: RgbImage,
    }

    impl BattleScene {
        pub const TURN_CARD_AT: Point = Point::new(10, 85);
        pub const CONTINUE_AT: Point = Point::new(98, 85);
        pub const CAPTURE_AT: Point = Point::new(96, 34);
        pub const OKAY_AT: Point = Point::new(77, 24);

        pub fn new(name: &str) -> Self {
            let dir = temp_dir(name);
            let turn_card = textured(40, 6, 33);
            let continue_button = textured(16, 10, 31);
            let capture_button = textured(12, 8, 32);
            let okay = textured(14, 8, 22);

            let mut config = BotConfig::default();
            config.timing.pointer_glide_ms = 0;
            config.regions.turn_card = Roi::new(10, 85, 40, 6);
            config.regions.enemy_name = Roi::new(80, 2, 30, 5);
            config.regions.capture_percent = Roi::new(50, 5, 8, 4);
            config.regions.ready_to_train = Roi::new(40, 40, 20, 3);
            config.regions.okay_after_train = Roi::new(40, 50, 10, 4);
            config.regions.continue_after_train = Roi::new(60, 50, 18, 4);
            config.regions.okay_final = Roi::new(40, 70, 12, 5);
            config.templates.continue_button = write_template(&dir, "Continue.png", &continue_button);
            config.templates.capture_button = write_template(&dir, "Capture button.png", &capture_button);
            config.templates.okay = write_template(&dir, "okay.png", &okay);
            config.templates.turn_card =
                TemplateSpec::new(dir.join("reference_images").join("It's your turn!.png"));
            config.files.handoff = dir.join("config_file.txt");
            config.files.encounters = dir.join("target_encounters.txt");
            config.files.debug_dir = dir.join("screenshots");

            Self {
                dir,
                config,
                screen: ScriptedScreen::default(),
                turn_card,
                continue_button,
                capture_button,
                okay,
            }
        }

        /// Save the turn-card reference as if a previous battle had done it
        pub fn write_turn_card(&self) {
            let path = &self.config.templates.turn_card.path;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("reference dir");
            }
            self.turn_card.save(path).expect("save turn card");
        }

        /// Screen showing the named elements: turn, continue, capture, okay
        pub fn frame(&self, elements: &[&str]) -> RgbImage {
            let mut screen = blank_screen(120, 100);
            for element in elements {
                let (patch, at) = match *element {
                    "turn" => (&self.turn_card, Self::TURN_CARD_AT),
                    "continue" => (&self.continue_button, Point::new(90, 80)),
                    "capture" => (&self.capture_button, Point::new(90, 30)),
                    "okay" => (&self.okay, Point::new(70, 20)),
                    other => panic!("unknown element {}", other),
                };
                screen = with_patch(screen, patch, at);
            }
            screen
        }

        pub fn perception(&self, ocr: &ScriptedOcr) -> Perception {
            Perception::new(
                Box::new(self.screen.clone()),
                Box::new(ocr.clone()),
                self.config.files.debug_dir.clone(),
                self.config.thresholds.fuzzy,
            )
        }
    }

    impl Drop for BattleScene {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
