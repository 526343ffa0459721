pub mod models;
pub mod services;

use models::config::BotConfig;
use services::battle_engine::BattleEngine;
use services::battle_launcher::{check_resources, ProcessBattleRunner};
use services::farm_loop::FarmLoop;
use services::ocr::TesseractEngine;
use services::perception::Perception;
use services::pointer::EnigoPointer;
use services::screen_capture::ScreenCapture;
use std::path::Path;

/// Perception over the primary monitor and Tesseract
fn init_perception(config: &BotConfig) -> Result<Perception, String> {
    let screen = ScreenCapture::new()?;
    let ocr = TesseractEngine::new()?;

    Ok(Perception::new(
        Box::new(screen),
        Box::new(ocr),
        config.files.debug_dir.clone(),
        config.thresholds.fuzzy,
    ))
}

/// Run the farming loop until Ctrl-C. `config_path` is handed to each
/// battle run so both processes read the same settings.
pub async fn run_farm(config: BotConfig, config_path: &Path) -> Result<(), String> {
    let perception = init_perception(&config)?;
    let pointer = EnigoPointer::new()?;
    let runner = ProcessBattleRunner::new(&config.launcher, config_path)?;

    check_resources(&config, runner.program());

    let mut farm = FarmLoop::new(config, perception, Box::new(pointer), runner);
    farm.run().await;
    Ok(())
}

/// Play the battle currently on screen, then return
pub async fn run_battle(config: BotConfig) -> Result<(), String> {
    let perception = init_perception(&config)?;
    let pointer = EnigoPointer::new()?;

    let mut battle = BattleEngine::new(config, perception, Box::new(pointer));
    let outcome = battle.run().await;
    tracing::info!("Battle over: {:?}", outcome);
    Ok(())
}
