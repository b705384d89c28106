use std::ffi::OsString;
use std::path::PathBuf;

use peon_core::context::{DeliveryMode, PeonConfig, PeonConfigExt};

/// Environment variables set by sshd for an interactive or command session
const SSH_ENV_VARS: [&str; 3] = ["SSH_CONNECTION", "SSH_CLIENT", "SSH_TTY"];

/// Command-line overrides shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct CliContext {
    /// Explicit config file instead of the platform default
    config_override: Option<PathBuf>,
    delivery_override: Option<DeliveryMode>,
}

impl CliContext {
    pub fn new(config_override: Option<PathBuf>, delivery_override: Option<DeliveryMode>) -> Self {
        Self {
            config_override,
            delivery_override,
        }
    }

    pub fn config_path(&self) -> Result<PathBuf, String> {
        match &self.config_override {
            Some(path) => Ok(path.clone()),
            None => PeonConfig::config_path().map_err(|e| e.to_string()),
        }
    }

    /// Read a fresh config snapshot.
    ///
    /// An explicit `--config` file must be readable; the default location falls
    /// back to defaults.
    pub fn load_config(&self) -> Result<PeonConfig, String> {
        match &self.config_override {
            Some(path) => PeonConfig::load_from(path).map_err(|e| format!("{e}: {}", error_chain(&e))),
            None => Ok(PeonConfig::load()),
        }
    }

    pub fn delivery(&self, config: &PeonConfig) -> DeliveryMode {
        self.delivery_override.unwrap_or(config.delivery)
    }

    /// Whether the speakers are on another machine
    pub fn is_remote(&self, config: &PeonConfig) -> bool {
        match self.delivery(config) {
            DeliveryMode::Direct => false,
            DeliveryMode::Relay => true,
            DeliveryMode::Auto => in_ssh_session(),
        }
    }
}

pub fn in_ssh_session() -> bool {
    ssh_session_from(|name| std::env::var_os(name))
}

fn ssh_session_from(lookup: impl Fn(&str) -> Option<OsString>) -> bool {
    SSH_ENV_VARS
        .iter()
        .any(|name| lookup(name).is_some_and(|value| !value.is_empty()))
}

/// Innermost cause of an error, for one-line messages
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_detection_needs_a_non_empty_variable() {
        assert!(!ssh_session_from(|_| None));
        assert!(!ssh_session_from(|_| Some(OsString::new())));
        assert!(ssh_session_from(|name| {
            (name == "SSH_TTY").then(|| OsString::from("/dev/pts/3"))
        }));
        assert!(ssh_session_from(|name| {
            (name == "SSH_CONNECTION").then(|| OsString::from("10.0.0.2 51234 10.0.0.5 22"))
        }));
    }

    #[test]
    fn test_delivery_override_wins() {
        let mut config = PeonConfig::default();
        config.delivery = DeliveryMode::Direct;

        let ctx = CliContext::new(None, Some(DeliveryMode::Relay));
        assert_eq!(ctx.delivery(&config), DeliveryMode::Relay);
        assert!(ctx.is_remote(&config));

        let ctx = CliContext::default();
        assert_eq!(ctx.delivery(&config), DeliveryMode::Direct);
        assert!(!ctx.is_remote(&config));
    }

    #[test]
    fn test_explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peon.toml");
        std::fs::write(&path, "pack = \"glados\"\nvolume = 0.25\n").unwrap();

        let ctx = CliContext::new(Some(path.clone()), None);
        let config = ctx.load_config().unwrap();
        assert_eq!(config.pack, "glados");
        assert_eq!(config.volume, 0.25);
        assert_eq!(ctx.config_path().unwrap(), path);
    }

    #[test]
    fn test_broken_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peon.toml");
        std::fs::write(&path, "volume = [").unwrap();

        assert!(CliContext::new(Some(path), None).load_config().is_err());
    }
}
