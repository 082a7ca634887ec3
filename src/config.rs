//! Top-level process configuration, loaded via `serde` from a TOML
//! file. Field grouping mirrors the subsystems that own each knob:
//! [`crate::autosave::AutosaveConfig`] is reused directly rather than
//! duplicated here.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::autosave::AutosaveConfig;
use crate::error::{Result, VfsError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub autosave: AutosaveConfig,
    pub mount_allowed: bool,
    pub snapshot: SnapshotConfig,
    pub logic: LogicConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autosave: AutosaveConfig::default(),
            mount_allowed: true,
            snapshot: SnapshotConfig::default(),
            logic: LogicConfig::default(),
        }
    }
}

/// Snapshot file naming. `backup_dir_name` is "`.vfsh`", a dotfile-style
/// directory name in the shell's own working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub default_extension: String,
    pub backup_dir_name: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { default_extension: "vfs".to_string(), backup_dir_name: ".vfsh".to_string() }
    }
}

/// Defaults match the hardcoded constants in `logic::engine`; this
/// struct exists so callers building the initial inference pass have a
/// documented, overridable knob rather than a magic literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicConfig {
    pub default_min_confidence: f64,
    pub consistency_threshold: f64,
}

impl Default for LogicConfig {
    fn default() -> Self {
        Self { default_min_confidence: 0.8, consistency_threshold: 0.95 }
    }
}

impl Config {
    /// Loads from a TOML file, falling back to field-level defaults for
    /// anything the file omits (`#[serde(default)]` on every section).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(VfsError::from)?;
        toml::from_str(&text).map_err(|e| VfsError::ParseError(format!("invalid config at {}: {e}", path.as_ref().display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = Config::default();
        assert_eq!(config.autosave.delay_seconds, 10);
        assert_eq!(config.autosave.crash_recovery_interval_seconds, 180);
        assert_eq!(config.logic.default_min_confidence, 0.8);
        assert_eq!(config.logic.consistency_threshold, 0.95);
        assert_eq!(config.snapshot.backup_dir_name, ".vfsh");
    }

    #[test]
    fn partial_toml_fills_in_remaining_defaults() {
        let config: Config = toml::from_str("mount_allowed = false\n\n[autosave]\ndelay_seconds = 5\n").unwrap();
        assert!(!config.mount_allowed);
        assert_eq!(config.autosave.delay_seconds, 5);
        assert_eq!(config.autosave.crash_recovery_interval_seconds, 180);
        assert_eq!(config.logic.consistency_threshold, 0.95);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/path/to/config.toml").unwrap_err();
        assert!(matches!(err, VfsError::IoError(_)));
    }
}
