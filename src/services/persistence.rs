//! Small files shared by the farm and battle processes.
//!
//! Only one process touches them at a time (farm blocks on battle), so there
//! is no locking. Every write replaces the whole file through a temp file and
//! a rename so an interrupt never leaves a half-written line behind.

use crate::models::config::{FileConfig, TargetConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Target handed from the farm loop to the battle run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub target: String,
    pub platinum_training: bool,
}

impl Handoff {
    pub fn new(target: impl Into<String>, platinum_training: bool) -> Self {
        Self {
            target: target.into(),
            platinum_training,
        }
    }

    /// Parse `<name>|<flag>` or a legacy bare `<name>`. The flag compares
    /// case-insensitively with "true"; anything else is false.
    pub fn parse(content: &str, legacy_platinum_default: bool) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        match content.split_once('|') {
            Some((name, flag)) => Some(Self::new(
                name.trim(),
                flag.trim().eq_ignore_ascii_case("true"),
            )),
            None => Some(Self::new(content, legacy_platinum_default)),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{}|{}", self.target, self.platinum_training)
    }
}

impl From<&TargetConfig> for Handoff {
    fn from(target: &TargetConfig) -> Self {
        Self::new(target.name.clone(), target.platinum_training)
    }
}

/// The handoff file, written by `farm` at startup and read by `battle`
pub struct HandoffFile {
    path: PathBuf,
    legacy_platinum_default: bool,
}

impl HandoffFile {
    pub fn new(files: &FileConfig) -> Self {
        Self {
            path: files.handoff.clone(),
            legacy_platinum_default: files.legacy_platinum_default,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, handoff: &Handoff) -> Result<(), String> {
        write_whole(&self.path, &handoff.to_line())?;
        tracing::info!(
            "Configuration saved: {}, Platinum Training: {}",
            handoff.target,
            handoff.platinum_training
        );
        Ok(())
    }

    /// Read the handoff; a missing, empty or unreadable file yields `fallback`
    pub fn read_or(&self, fallback: &TargetConfig) -> Handoff {
        match fs::read_to_string(&self.path) {
            Ok(content) => match Handoff::parse(&content, self.legacy_platinum_default) {
                Some(handoff) => handoff,
                None => {
                    tracing::warn!("Handoff file {} is empty", self.path.display());
                    Handoff::from(fallback)
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Could not read handoff file {}: {}, using configured target",
                    self.path.display(),
                    e
                );
                Handoff::from(fallback)
            }
        }
    }
}

/// Persistent count of battles against the target creature
pub struct EncounterCounter {
    path: PathBuf,
}

impl EncounterCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current count; an absent file is 0
    pub fn load(&self) -> u64 {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return 0,
        };

        content.trim().parse().unwrap_or_else(|e| {
            tracing::warn!(
                "Encounter counter {} unreadable ({}), counting from 0",
                self.path.display(),
                e
            );
            0
        })
    }

    pub fn save(&self, count: u64) -> Result<(), String> {
        write_whole(&self.path, &count.to_string())
    }

    /// Read-modify-write; returns the new count
    pub fn increment(&self) -> Result<u64, String> {
        let count = self.load() + 1;
        self.save(count)?;
        Ok(count)
    }
}

/// Replace a file's contents in one rename
fn write_whole(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory for {}: {}", path.display(), e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| format!("Failed to write {}: {}", tmp.display(), e))?;
    fs::rename(&tmp, path).map_err(|e| format!("Failed to replace {}: {}", path.display(), e))?;
    Ok(())
}
