use crate::models::roi::{Point, Roi};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default match threshold for every reference template
pub const DEFAULT_TEMPLATE_THRESHOLD: f32 = 0.7;

/// Creature being hunted and how the post-battle training should confirm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TargetConfig {
    pub name: String,
    pub platinum_training: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: "Light Bludger".to_string(),
            platinum_training: false,
        }
    }
}

/// Polling cadence of the farming loop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Minimum seconds between two farm clicks
    pub farm_cooldown_secs: u64,
    /// Number of battle-start polls after a farm click
    pub battle_check_window: u32,
    pub battle_check_interval_ms: u64,
    /// Backoff after a miss or a failed cycle
    pub retry_backoff_secs: u64,
    /// Pointer travel time before each click
    pub pointer_glide_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            farm_cooldown_secs: 20,
            battle_check_window: 15,
            battle_check_interval_ms: 1000,
            retry_backoff_secs: 5,
            pointer_glide_ms: 200,
        }
    }
}

/// Decision thresholds tuned against one game build and resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    /// OCR text vs expected phrase, match iff ratio > fuzzy
    pub fuzzy: f64,
    /// Capture button is pressed iff chance > capture_chance
    pub capture_chance: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            fuzzy: 0.7,
            capture_chance: 85,
        }
    }
}

/// OCR regions, logical screen coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    pub turn_card: Roi,
    pub enemy_name: Roi,
    pub capture_percent: Roi,
    pub ready_to_train: Roi,
    pub okay_after_train: Roi,
    pub continue_after_train: Roi,
    pub okay_final: Roi,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            turn_card: Roi::new(522, 965, 180, 25),
            enemy_name: Roi::new(774, 50, 100, 15),
            capture_percent: Roi::new(556, 135, 40, 18),
            ready_to_train: Roi::new(472, 490, 78, 9),
            okay_after_train: Roi::new(545, 622, 50, 20),
            continue_after_train: Roi::new(638, 660, 71, 20),
            okay_final: Roi::new(550, 742, 47, 16),
        }
    }
}

/// Semantic click targets.
///
/// These only hold for the layout the reference templates were captured at;
/// revalidate every point after a resolution or UI change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClickMap {
    pub attack_slots: [Point; 4],
    pub train_icon: Point,
    pub second_miscrit: Point,
    pub train_now: Point,
    pub platinum_confirm: Point,
    pub platinum_continue: Point,
    pub standard_continue: Point,
    pub close_panel: Point,
}

impl Default for ClickMap {
    fn default() -> Self {
        Self {
            attack_slots: [
                Point::new(330, 1025),
                Point::new(500, 1025),
                Point::new(670, 1025),
                Point::new(840, 1025),
            ],
            train_icon: Point::new(515, 60),
            second_miscrit: Point::new(376, 414),
            train_now: Point::new(600, 347),
            platinum_confirm: Point::new(530, 786),
            platinum_continue: Point::new(579, 784),
            standard_continue: Point::new(681, 781),
            close_panel: Point::new(850, 325),
        }
    }
}

/// A reference image and the score it must exceed to count as present
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateSpec {
    pub path: PathBuf,
    #[serde(default = "default_template_threshold")]
    pub threshold: f32,
}

fn default_template_threshold() -> f32 {
    DEFAULT_TEMPLATE_THRESHOLD
}

impl TemplateSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            threshold: DEFAULT_TEMPLATE_THRESHOLD,
        }
    }
}

/// Reference template images
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateConfig {
    pub farm_object: TemplateSpec,
    pub okay: TemplateSpec,
    pub continue_button: TemplateSpec,
    pub capture_button: TemplateSpec,
    /// Written once at runtime by the battle bootstrap if absent
    pub turn_card: TemplateSpec,
    pub drops: Vec<TemplateSpec>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            farm_object: TemplateSpec::new("Insert_images/reference_image.png"),
            okay: TemplateSpec::new("reference_images/okay.png"),
            continue_button: TemplateSpec::new("reference_images/Continue.png"),
            capture_button: TemplateSpec::new("reference_images/Capture button.png"),
            turn_card: TemplateSpec::new("reference_images/It's your turn!.png"),
            drops: vec![
                TemplateSpec::new("reference_images/potion drop.png"),
                TemplateSpec::new("reference_images/gold drop.png"),
            ],
        }
    }
}

/// Files shared between the farm and battle processes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// `<name>|<true|false>` or a legacy bare name
    pub handoff: PathBuf,
    pub encounters: PathBuf,
    pub debug_dir: PathBuf,
    /// Training flag assumed when the handoff file holds a bare legacy name
    pub legacy_platinum_default: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            handoff: PathBuf::from("config_file.txt"),
            encounters: PathBuf::from("target_encounters.txt"),
            debug_dir: PathBuf::from("screenshots"),
            legacy_platinum_default: false,
        }
    }
}

/// How the farm loop launches a battle run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LauncherConfig {
    /// Program to run; the current executable when unset
    pub program: Option<PathBuf>,
}

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BotConfig {
    pub target: TargetConfig,
    pub timing: TimingConfig,
    pub thresholds: ThresholdConfig,
    pub regions: RegionConfig,
    pub clicks: ClickMap,
    pub templates: TemplateConfig,
    pub files: FileConfig,
    pub launcher: LauncherConfig,
}

impl BotConfig {
    /// Reject values that would make the loops misbehave
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.thresholds.fuzzy) {
            return Err(format!(
                "Fuzzy threshold {} out of range (0.0-1.0)",
                self.thresholds.fuzzy
            ));
        }

        if self.thresholds.capture_chance > 100 {
            return Err(format!(
                "Capture chance threshold {} out of range (0-100)",
                self.thresholds.capture_chance
            ));
        }

        let regions = [
            ("turn_card", &self.regions.turn_card),
            ("enemy_name", &self.regions.enemy_name),
            ("capture_percent", &self.regions.capture_percent),
            ("ready_to_train", &self.regions.ready_to_train),
            ("okay_after_train", &self.regions.okay_after_train),
            ("continue_after_train", &self.regions.continue_after_train),
            ("okay_final", &self.regions.okay_final),
        ];
        for (name, roi) in regions {
            if !roi.is_valid() {
                return Err(format!("Region {} has zero size", name));
            }
        }

        if self.timing.battle_check_window == 0 {
            return Err("Battle check window must be at least one poll".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_config_default() {
        let config = BotConfig::default();

        assert_eq!(config.target.name, "Light Bludger");
        assert!(!config.target.platinum_training);

        assert_eq!(config.timing.farm_cooldown_secs, 20);
        assert_eq!(config.timing.battle_check_window, 15);
        assert_eq!(config.timing.retry_backoff_secs, 5);

        assert_eq!(config.thresholds.fuzzy, 0.7);
        assert_eq!(config.thresholds.capture_chance, 85);

        assert_eq!(config.regions.turn_card, Roi::new(522, 965, 180, 25));
        assert_eq!(config.clicks.attack_slots[0], Point::new(330, 1025));
        assert_eq!(config.templates.drops.len(), 2);
        assert_eq!(config.templates.okay.threshold, DEFAULT_TEMPLATE_THRESHOLD);
        assert!(!config.files.legacy_platinum_default);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bot_config_serialization() {
        let config = BotConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: BotConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{
            "target": { "name": "Flameling" },
            "timing": { "farm_cooldown_secs": 30 },
            "templates": { "drops": [ { "path": "drops/chest.png" } ] }
        }"#;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.target.name, "Flameling");
        assert!(!config.target.platinum_training);
        assert_eq!(config.timing.farm_cooldown_secs, 30);
        assert_eq!(config.timing.battle_check_window, 15);
        assert_eq!(config.templates.drops, vec![TemplateSpec::new("drops/chest.png")]);
        assert_eq!(config.templates.farm_object, TemplateConfig::default().farm_object);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = BotConfig::default();
        config.thresholds.fuzzy = 1.5;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.thresholds.capture_chance = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_region() {
        let mut config = BotConfig::default();
        config.regions.enemy_name = Roi::new(774, 50, 0, 15);
        let err = config.validate().unwrap_err();
        assert!(err.contains("enemy_name"));
    }

    #[test]
    fn test_validate_rejects_empty_battle_window() {
        let mut config = BotConfig::default();
        config.timing.battle_check_window = 0;
        assert!(config.validate().is_err());
    }
}
