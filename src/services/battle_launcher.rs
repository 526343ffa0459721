use crate::models::config::{BotConfig, LauncherConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Runs one battle to completion
#[allow(async_fn_in_trait)]
pub trait BattleRunner {
    /// Ok when the battle run finished normally
    async fn run_battle(&mut self) -> Result<(), String>;
}

/// Launches the battle as a separate process and waits for it to exit
pub struct ProcessBattleRunner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessBattleRunner {
    /// `battle --config <config_path>` on the configured program, or on the
    /// running executable when none is configured
    pub fn new(launcher: &LauncherConfig, config_path: &Path) -> Result<Self, String> {
        let program = match &launcher.program {
            Some(program) => program.clone(),
            None => std::env::current_exe()
                .map_err(|e| format!("Failed to get exe path: {}", e))?,
        };

        Ok(Self {
            program,
            args: vec![
                OsString::from("battle"),
                OsString::from("--config"),
                config_path.as_os_str().to_owned(),
            ],
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl BattleRunner for ProcessBattleRunner {
    async fn run_battle(&mut self) -> Result<(), String> {
        tracing::debug!("📍 Battle program: {:?} {:?}", self.program, self.args);

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| format!("Battle program not started ({}): {}", self.program.display(), e))?;

        if !status.success() {
            return Err(format!("Battle run failed with {}", status));
        }
        Ok(())
    }
}

/// Warn about missing inputs before farming; the loop runs degraded without them
pub fn check_resources(config: &BotConfig, battle_program: &Path) -> usize {
    let mut missing = 0;

    if !config.templates.farm_object.path.exists() {
        tracing::warn!(
            "Reference image not found at {}. Please ensure it exists before starting.",
            config.templates.farm_object.path.display()
        );
        missing += 1;
    }

    if !battle_program.exists() {
        tracing::warn!(
            "Battle program not found at {}. Battles will not be played.",
            battle_program.display()
        );
        missing += 1;
    }

    missing
}
