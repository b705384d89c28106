//! Application configuration
//!
//! This module re-exports the shared snapshot types from peon-types and provides
//! persistence and path resolution for PeonConfig.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::ConfigError;

// Re-export all shared types
pub use peon_types::{CategoryToggles, DeliveryMode, PeonConfig, RelaySettings};

const APP_NAME: &str = "remote-peon";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Path Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Replaces a leading `~` with the user's home directory.
pub fn resolve_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

// ─────────────────────────────────────────────────────────────────────────────
// PeonConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for PeonConfig persistence and resolved accessors
pub trait PeonConfigExt: Sized {
    /// Load from the platform config dir, falling back to defaults on error
    fn load() -> Self;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;

    fn packs_dir(&self) -> PathBuf;
    fn event_file_path(&self) -> PathBuf;
    fn debounce(&self) -> Duration;
    fn polling_interval(&self) -> Duration;
    fn relay_idle_timeout(&self) -> Duration;
}

impl PeonConfigExt for PeonConfig {
    fn load() -> Self {
        match confy::load(APP_NAME, CONFIG_NAME) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load configuration, using defaults");
                Self::default()
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        confy::load_path(path).map_err(|source| ConfigError::LoadPath {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?)
    }

    fn packs_dir(&self) -> PathBuf {
        resolve_home(&self.packs_directory)
    }

    fn event_file_path(&self) -> PathBuf {
        resolve_home(&self.event_file)
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn polling_interval(&self) -> Duration {
        // notify's poll watcher spins on a zero interval
        Duration::from_millis(self.polling_interval_ms.max(10))
    }

    fn relay_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.idle_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilde_paths_expand_to_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(resolve_home("~"), home);
        assert_eq!(resolve_home("~/.remote-peon/packs"), home.join(".remote-peon/packs"));
        assert_eq!(resolve_home("/tmp/remote-peon.ev"), PathBuf::from("/tmp/remote-peon.ev"));
        assert_eq!(resolve_home("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_config_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = PeonConfig::default();
        config.pack = "glados".to_string();
        config.debounce_ms = 500;
        config.sounds.acknowledge = true;
        config.save_to(&path).unwrap();

        let loaded = PeonConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let loaded = PeonConfig::load_from(&path).unwrap();
        assert_eq!(loaded, PeonConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "volume = \"loud\"").unwrap();

        assert!(matches!(
            PeonConfig::load_from(&path),
            Err(ConfigError::LoadPath { .. })
        ));
    }
}
