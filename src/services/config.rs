use crate::models::config::BotConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager for bot settings
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for the platform config directory
    ///
    /// This will create the config directory if it doesn't exist.
    /// Returns an error if directory creation fails.
    pub fn new() -> Result<Self, String> {
        let config_dir = dirs::config_dir()
            .ok_or("Failed to determine config directory")?
            .join("miscrit-farmer");

        fs::create_dir_all(&config_dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let config_path = config_dir.join("config.json");

        Ok(Self {
            config_dir,
            config_path,
        })
    }

    /// Use an explicit settings file (`--config`)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let config_path = path.into();
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            config_dir,
            config_path,
        }
    }

    /// Save configuration to disk
    pub fn save(&self, config: &BotConfig) -> Result<(), String> {
        if !self.config_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.config_dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        // Pretty print for hand editing of coordinates
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_path, json)
            .map_err(|e| format!("Failed to write config file: {}", e))?;

        Ok(())
    }

    /// Load configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<BotConfig, String> {
        if !self.config_exists() {
            tracing::info!(
                "No settings at {}, using defaults",
                self.config_path.display()
            );
            return Ok(BotConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: BotConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Check if config file exists
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roi::Roi;
    use std::fs;

    /// Helper to create a temporary test config manager
    fn create_test_manager() -> ConfigManager {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!(
            "miscrit-farmer-config-{}-{}",
            std::process::id(),
            id
        ));
        let _ = fs::remove_dir_all(&temp_dir);
        // Directory is left for save() to create

        ConfigManager::with_path(temp_dir.join("config.json"))
    }

    fn cleanup_test_files(manager: &ConfigManager) {
        let _ = fs::remove_dir_all(&manager.config_dir);
    }

    #[test]
    fn test_config_manager_new() {
        let manager = ConfigManager::new().expect("ConfigManager::new() should succeed");

        assert!(
            manager.config_dir.exists(),
            "Config directory should exist: {:?}",
            manager.config_dir
        );
        assert!(manager.config_path.ends_with("miscrit-farmer/config.json"));
    }

    #[test]
    fn test_config_save() {
        let manager = create_test_manager();

        manager.save(&BotConfig::default()).expect("save() should succeed");
        assert!(manager.config_path.exists());

        let file_content = fs::read_to_string(&manager.config_path).unwrap();
        let _parsed: BotConfig =
            serde_json::from_str(&file_content).expect("Saved config should be valid JSON");

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_load_default_when_not_exists() {
        let manager = create_test_manager();
        assert!(!manager.config_exists());

        let config = manager.load().expect("load() should default when file is missing");
        assert_eq!(config, BotConfig::default());

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_save_and_load() {
        let manager = create_test_manager();

        let mut config = BotConfig::default();
        config.target.name = "Flameling".to_string();
        config.target.platinum_training = true;
        config.timing.farm_cooldown_secs = 25;
        config.regions.enemy_name = Roi::new(780, 52, 110, 16);

        manager.save(&config).expect("save should succeed");
        let loaded = manager.load().expect("load should succeed");

        assert_eq!(loaded, config);
        assert_eq!(loaded.timing.farm_cooldown_secs, 25);

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_load_rejects_invalid_values() {
        let manager = create_test_manager();
        fs::create_dir_all(&manager.config_dir).unwrap();
        fs::write(&manager.config_path, r#"{ "thresholds": { "fuzzy": 7.0 } }"#).unwrap();

        let err = manager.load().unwrap_err();
        assert!(err.contains("Fuzzy threshold"));

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_load_rejects_garbage() {
        let manager = create_test_manager();
        fs::create_dir_all(&manager.config_dir).unwrap();
        fs::write(&manager.config_path, "not json").unwrap();

        assert!(manager.load().unwrap_err().starts_with("Failed to parse config file"));

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_file_path() {
        let manager = create_test_manager();
        assert!(manager.config_file_path().ends_with("config.json"));
        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_overwrite() {
        let manager = create_test_manager();

        let mut first = BotConfig::default();
        first.timing.retry_backoff_secs = 3;
        manager.save(&first).unwrap();

        let mut second = BotConfig::default();
        second.timing.retry_backoff_secs = 9;
        manager.save(&second).unwrap();

        assert_eq!(manager.load().unwrap().timing.retry_backoff_secs, 9);

        cleanup_test_files(&manager);
    }
}
