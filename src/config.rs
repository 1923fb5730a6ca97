use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DriverError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HdcSettings {
    pub command_path: String,
    pub shell_timeout_secs: u64,
    pub transfer_timeout_secs: u64,
    pub install_timeout_secs: u64,
    pub cleanup_timeout_secs: u64,
}

impl Default for HdcSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            shell_timeout_secs: 60,
            transfer_timeout_secs: 120,
            install_timeout_secs: 180,
            cleanup_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureSettings {
    // uitest rejects swipe velocities outside this range; the exact bounds
    // vary by device firmware, so they stay configurable.
    pub min_velocity: i64,
    pub max_velocity: i64,
    pub fallback_velocity: i64,
    pub swipe_settle_ms: u64,
    pub long_press_ms: u64,
    pub drag_settle_ms: u64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            min_velocity: 200,
            max_velocity: 40000,
            fallback_velocity: 600,
            swipe_settle_ms: 100,
            long_press_ms: 300,
            drag_settle_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenSettings {
    pub fallback_width: i32,
    pub fallback_height: i32,
    pub use_normalized: bool,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            fallback_width: 1080,
            fallback_height: 2400,
            use_normalized: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    #[serde(default)]
    pub hdc: HdcSettings,
    #[serde(default)]
    pub gestures: GestureSettings,
    #[serde(default)]
    pub screen: ScreenSettings,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("HDC_BRIDGE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".hdc_bridge_config.json")
}

pub fn backup_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".hdc_bridge_config.backup.json")
}

pub fn load_config(trace_id: &str) -> Result<DriverConfig, DriverError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &DriverConfig, trace_id: &str) -> Result<(), DriverError> {
    save_config_to_path(config, &config_path(), &backup_config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<DriverConfig, DriverError> {
    if !path.exists() {
        return Ok(DriverConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| DriverError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: DriverConfig = serde_json::from_str(&raw)
        .map_err(|err| DriverError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &DriverConfig,
    path: &Path,
    backup_path: &Path,
    trace_id: &str,
) -> Result<(), DriverError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config).map_err(|err| {
        DriverError::system(format!("Failed to serialize config: {err}"), trace_id)
    })?;
    fs::write(path, payload)
        .map_err(|err| DriverError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

fn validate_config(mut config: DriverConfig) -> DriverConfig {
    let defaults = GestureSettings::default();
    if config.gestures.min_velocity < 1 {
        config.gestures.min_velocity = defaults.min_velocity;
    }
    if config.gestures.max_velocity < config.gestures.min_velocity {
        config.gestures.max_velocity = defaults.max_velocity.max(config.gestures.min_velocity);
    }
    if config.gestures.fallback_velocity < config.gestures.min_velocity
        || config.gestures.fallback_velocity > config.gestures.max_velocity
    {
        config.gestures.fallback_velocity = config.gestures.min_velocity;
    }
    if config.hdc.shell_timeout_secs == 0 {
        config.hdc.shell_timeout_secs = HdcSettings::default().shell_timeout_secs;
    }
    if config.hdc.transfer_timeout_secs == 0 {
        config.hdc.transfer_timeout_secs = HdcSettings::default().transfer_timeout_secs;
    }
    if config.hdc.install_timeout_secs == 0 {
        config.hdc.install_timeout_secs = HdcSettings::default().install_timeout_secs;
    }
    if config.hdc.cleanup_timeout_secs == 0 {
        config.hdc.cleanup_timeout_secs = HdcSettings::default().cleanup_timeout_secs;
    }
    if config.screen.fallback_width < 1 {
        config.screen.fallback_width = ScreenSettings::default().fallback_width;
    }
    if config.screen.fallback_height < 1 {
        config.screen.fallback_height = ScreenSettings::default().fallback_height;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().expect("tmp");
        let config = load_config_from_path(&dir.path().join("absent.json"), "trace-test")
            .expect("load");
        assert_eq!(config, DriverConfig::default());
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let dir = TempDir::new().expect("tmp");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"gestures": {"min_velocity": 300, "max_velocity": 5000, "fallback_velocity": 600, "swipe_settle_ms": 100, "long_press_ms": 300, "drag_settle_ms": 200}}"#)
            .expect("write");
        let config = load_config_from_path(&path, "trace-test").expect("load");
        assert_eq!(config.gestures.min_velocity, 300);
        assert_eq!(config.hdc, HdcSettings::default());
        assert_eq!(config.screen, ScreenSettings::default());
    }

    #[test]
    fn clamps_invalid_values() {
        let mut config = DriverConfig::default();
        config.gestures.min_velocity = 0;
        config.gestures.max_velocity = -10;
        config.gestures.fallback_velocity = 99999999;
        config.hdc.shell_timeout_secs = 0;
        config.screen.fallback_width = 0;
        let validated = validate_config(config);
        assert_eq!(validated.gestures.min_velocity, 200);
        assert!(validated.gestures.max_velocity >= validated.gestures.min_velocity);
        assert_eq!(validated.gestures.fallback_velocity, 200);
        assert_eq!(validated.hdc.shell_timeout_secs, 60);
        assert_eq!(validated.screen.fallback_width, 1080);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().expect("tmp");
        let path = dir.path().join("config.json");
        let backup = dir.path().join("config.backup.json");
        let mut config = DriverConfig::default();
        config.screen.fallback_width = 1440;
        config.screen.fallback_height = 3200;
        save_config_to_path(&config, &path, &backup, "trace-test").expect("save");
        let loaded = load_config_from_path(&path, "trace-test").expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn save_keeps_backup_of_previous_file() {
        let dir = TempDir::new().expect("tmp");
        let path = dir.path().join("config.json");
        let backup = dir.path().join("config.backup.json");
        save_config_to_path(&DriverConfig::default(), &path, &backup, "trace-test")
            .expect("first save");
        let mut changed = DriverConfig::default();
        changed.gestures.max_velocity = 9000;
        save_config_to_path(&changed, &path, &backup, "trace-test").expect("second save");
        let previous = load_config_from_path(&backup, "trace-test").expect("load backup");
        assert_eq!(previous, DriverConfig::default());
    }
}
