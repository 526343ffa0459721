use crate::models::config::BotConfig;
use crate::models::roi::Point;
use crate::services::battle_launcher::BattleRunner;
use crate::services::evidence;
use crate::services::persistence::{Handoff, HandoffFile};
use crate::services::perception::Perception;
use crate::services::pointer::{click_at, glide_to, Pointer};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// What one farming cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Cooldown still running; slept for the remainder
    CoolingDown(Duration),
    /// Farm object not on screen; backed off
    NotFound,
    /// A battle started and the battle run returned
    Battle,
    /// No battle within the window; this many drops were clicked
    NoBattle { drops: usize },
}

/// Cooldown-gated farming: click the farm object, watch for a battle,
/// hand the battle to `runner`, pick up drops otherwise.
pub struct FarmLoop<R: BattleRunner> {
    config: BotConfig,
    perception: Perception,
    pointer: Box<dyn Pointer>,
    runner: R,
    last_farm: Option<Instant>,
}

impl<R: BattleRunner> FarmLoop<R> {
    pub fn new(config: BotConfig, perception: Perception, pointer: Box<dyn Pointer>, runner: R) -> Self {
        Self {
            config,
            perception,
            pointer,
            runner,
            last_farm: None,
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.config.timing.farm_cooldown_secs)
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(self.config.timing.retry_backoff_secs)
    }

    fn glide(&self) -> Duration {
        Duration::from_millis(self.config.timing.pointer_glide_ms)
    }

    /// Farm until the process is interrupted (Ctrl-C)
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Farm until `shutdown` completes. A cycle in progress is dropped at its
    /// next await; persisted files are only ever replaced whole.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        let handoff = Handoff::from(&self.config.target);
        if let Err(e) = HandoffFile::new(&self.config.files).write(&handoff) {
            tracing::error!("Error saving configuration: {}", e);
        }

        tracing::info!("Starting autofarm...");
        tracing::info!("Target miscrit: {}", self.config.target.name);
        tracing::info!("Platinum training: {}", self.config.target.platinum_training);
        tracing::info!("Farm cooldown: {} seconds", self.config.timing.farm_cooldown_secs);
        tracing::info!("Battle check window: {} polls", self.config.timing.battle_check_window);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Farming stopped by user.");
                    break;
                }
                result = self.cycle_with_recovery() => {
                    if let Some(outcome) = result {
                        tracing::debug!("Cycle finished: {:?}", outcome);
                    }
                }
            }
        }
    }

    async fn cycle_with_recovery(&mut self) -> Option<CycleOutcome> {
        match self.run_cycle().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Error in farming loop: {}", e);
                tracing::info!("Retrying in {:?}...", self.backoff());
                sleep(self.backoff()).await;
                None
            }
        }
    }

    /// One iteration: cooldown, farm click, battle watch, drops
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, String> {
        let observation = self.perception.capture()?;

        if let Some(last) = self.last_farm {
            let elapsed = last.elapsed();
            if elapsed < self.cooldown() {
                let wait = self.cooldown() - elapsed;
                tracing::info!("Waiting {:.1} seconds for cooldown...", wait.as_secs_f64());
                sleep(wait).await;
                return Ok(CycleOutcome::CoolingDown(wait));
            }
        }

        tracing::info!("Farming...");
        let Some(target) = self.perception.locate(&observation, &self.config.templates.farm_object) else {
            tracing::info!("Farming object not found. Skipping this cycle.");
            if self.dismiss_okay().await? {
                tracing::info!("'Okay' detected with template matching and clicked.");
            }
            tracing::info!("Retrying in {:?}...", self.backoff());
            sleep(self.backoff()).await;
            return Ok(CycleOutcome::NotFound);
        };

        tracing::info!("Farming object found at ({}, {}). Clicking...", target.x, target.y);
        self.farm_click(target).await?;

        if self.watch_for_battle().await? {
            tracing::info!("Battle detected! Launching battle engine...");
            match self.runner.run_battle().await {
                Ok(()) => tracing::info!("Battle finished. Resuming farming."),
                Err(e) => tracing::warn!("Battle engine failed: {}", e),
            }
            return Ok(CycleOutcome::Battle);
        }

        tracing::info!("No battle detected. Checking for drops...");
        let drops = self.collect_drops().await?;
        Ok(CycleOutcome::NoBattle { drops })
    }

    /// Press/release then click; the game needs both to register a farm.
    /// The cooldown starts with the first button event, even if a later one fails.
    async fn farm_click(&mut self, target: Point) -> Result<(), String> {
        let glide = self.glide();
        glide_to(self.pointer.as_mut(), target, glide).await?;
        self.last_farm = Some(Instant::now());
        self.pointer.press()?;
        self.pointer.release()?;
        self.pointer.click()
    }

    /// Poll the turn card once per interval, up to the configured window
    async fn watch_for_battle(&mut self) -> Result<bool, String> {
        let interval = Duration::from_millis(self.config.timing.battle_check_interval_ms);
        tracing::info!(
            "Checking for battle for the next {} polls...",
            self.config.timing.battle_check_window
        );

        for _ in 0..self.config.timing.battle_check_window {
            let observation = self.perception.capture()?;
            if evidence::is_battle_starting(&self.perception, &observation, &self.config.regions.turn_card) {
                return Ok(true);
            }
            sleep(interval).await;
        }

        Ok(false)
    }

    /// Click the "Okay" dialog if one is showing
    async fn dismiss_okay(&mut self) -> Result<bool, String> {
        let observation = self.perception.capture()?;
        let Some(okay) = self.perception.locate(&observation, &self.config.templates.okay) else {
            return Ok(false);
        };

        let glide = self.glide();
        click_at(self.pointer.as_mut(), okay, glide).await?;
        Ok(true)
    }

    /// Click every configured drop visible on one capture; returns the count
    pub async fn collect_drops(&mut self) -> Result<usize, String> {
        let observation = self.perception.capture()?;
        let glide = self.glide();
        let mut clicked = 0;

        for drop in &self.config.templates.drops {
            if let Some(at) = self.perception.locate(&observation, drop) {
                tracing::info!("Drop {} at ({}, {}), collecting", drop.path.display(), at.x, at.y);
                click_at(self.pointer.as_mut(), at, glide).await?;
                clicked += 1;
            }
        }

        Ok(clicked)
    }
}
