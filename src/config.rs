use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Playback supervision settings.
///
/// The reference timings (100 ms fade tick, 3 minute auto-stop) are the
/// defaults; hosts can override them per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Interval between fade volume updates, in milliseconds
    pub fade_tick_ms: u64,

    /// Maximum playback duration before a session is force-stopped,
    /// in milliseconds
    pub auto_stop_ms: u64,

    /// Upper bound of the volume range (sessions without a fade start here)
    pub max_volume: f32,

    /// Root directory for bundled asset references (`assets/...`)
    #[serde(default)]
    pub asset_root: Option<PathBuf>,

    /// Root directory for relative source references
    #[serde(default)]
    pub data_root: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_tick_ms: 100,
            auto_stop_ms: 180_000, // 3 minutes
            max_volume: 1.0,
            asset_root: None,
            data_root: None,
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let config: PlaybackConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        tracing::info!("Loaded playback config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to a JSON file, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    /// Effective data root: the configured one, or the platform data directory.
    pub fn effective_data_root(&self) -> Option<PathBuf> {
        self.data_root.clone().or_else(dirs::data_dir)
    }

    /// Effective asset root: the configured one, or `assets` under the data root.
    pub fn effective_asset_root(&self) -> Option<PathBuf> {
        self.asset_root
            .clone()
            .or_else(|| self.effective_data_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.fade_tick_ms, 100);
        assert_eq!(config.auto_stop_ms, 180_000);
        assert_eq!(config.max_volume, 1.0);
        assert!(config.asset_root.is_none());
        assert!(config.data_root.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = PlaybackConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PlaybackConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.fade_tick_ms, deserialized.fade_tick_ms);
        assert_eq!(config.auto_stop_ms, deserialized.auto_stop_ms);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("playback.json");

        let mut config = PlaybackConfig::default();
        config.auto_stop_ms = 60_000;
        config.data_root = Some(PathBuf::from("/var/lib/alarm-audio"));
        config.save_to(&path).unwrap();

        let loaded = PlaybackConfig::load_from(&path).unwrap();
        assert_eq!(loaded.auto_stop_ms, 60_000);
        assert_eq!(loaded.data_root, Some(PathBuf::from("/var/lib/alarm-audio")));
    }

    #[test]
    fn test_config_load_missing_file() {
        let result = PlaybackConfig::load_from(Path::new("/nonexistent/playback.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_roots_prefer_configured() {
        let mut config = PlaybackConfig::default();
        config.data_root = Some(PathBuf::from("/data"));
        config.asset_root = Some(PathBuf::from("/bundle"));

        assert_eq!(config.effective_data_root(), Some(PathBuf::from("/data")));
        assert_eq!(config.effective_asset_root(), Some(PathBuf::from("/bundle")));
    }
}
