use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::ConfigError;
use crate::playback::PlaybackConfig;
use crate::typing_policy::TypingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_delay_ms: u64,
    pub speed_variation_ms: u64,
    pub pause_chance: f64,
    pub pause_duration_ms: u64,
    pub error_chance: f64,
    pub error_correct_delay_ms: u64,
    pub hold_after_complete_ms: u64,
    pub interaction_cooldown_ms: u64,
    pub auto_rotate: bool,
    pub sound_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_delay_ms: 50,
            speed_variation_ms: 20,
            pause_chance: 0.1,
            pause_duration_ms: 200,
            error_chance: 0.02,
            error_correct_delay_ms: 500,
            hold_after_complete_ms: 5000,
            interaction_cooldown_ms: 5000,
            auto_rotate: true,
            sound_enabled: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pause_chance", self.pause_chance),
            ("error_chance", self.error_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }
        Ok(())
    }

    pub fn typing(&self) -> TypingConfig {
        TypingConfig {
            base_delay_ms: self.base_delay_ms as f64,
            speed_variation_ms: self.speed_variation_ms as f64,
            pause_chance: self.pause_chance,
            pause_duration_ms: self.pause_duration_ms as f64,
            error_chance: self.error_chance,
            error_correct_delay_ms: self.error_correct_delay_ms as f64,
        }
    }

    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            hold_after_complete: Duration::from_millis(self.hold_after_complete_ms),
            interaction_cooldown: Duration::from_millis(self.interaction_cooldown_ms),
            auto_rotate: self.auto_rotate,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("codereel_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };

        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(err) => {
                    warn!(path = %self.path.display(), %err, "ignoring invalid config");
                    Config::default()
                }
            },
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            base_delay_ms: 30,
            error_chance: 0.0,
            auto_rotate: false,
            sound_enabled: false,
            ..Config::default()
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sound_enabled": false}"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert!(!loaded.sound_enabled);
        assert_eq!(loaded.base_delay_ms, 50);
        assert_eq!(loaded.hold_after_complete_ms, 5000);
    }

    #[test]
    fn invalid_probability_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"error_chance": 3.0, "base_delay_ms": 10}"#).unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn validate_names_offending_field() {
        let cfg = Config {
            pause_chance: -0.5,
            ..Config::default()
        };
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::InvalidProbability { field: "pause_chance", .. })
        );
    }

    #[test]
    fn projections_carry_values() {
        let cfg = Config {
            base_delay_ms: 70,
            hold_after_complete_ms: 1200,
            auto_rotate: false,
            ..Config::default()
        };
        assert_eq!(cfg.typing().base_delay_ms, 70.0);
        assert_eq!(cfg.typing().error_chance, 0.02);
        assert_eq!(
            cfg.playback().hold_after_complete,
            Duration::from_millis(1200)
        );
        assert!(!cfg.playback().auto_rotate);
    }
}
