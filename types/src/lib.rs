//! Shared types for remote-peon
//!
//! This crate contains the category registry and the serializable configuration
//! snapshot shared between the core pipeline (peon-core) and the host (peon-cli).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Category Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Agent lifecycle state that can trigger a sound.
///
/// The lowercase token of each variant is what the hook script writes to the
/// signal file and what sound pack manifests use as keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Session started and the agent is ready
    Greeting,
    /// Routine acknowledgment while the agent works
    Acknowledge,
    /// The agent needs input or a permission decision
    Permission,
    /// Task finished
    Complete,
    /// Something went wrong
    Error,
    /// Mild warning
    Annoyed,
}

impl Category {
    /// Every category, in manifest order.
    pub const ALL: [Category; 6] = [
        Category::Greeting,
        Category::Acknowledge,
        Category::Permission,
        Category::Complete,
        Category::Error,
        Category::Annoyed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Greeting => "greeting",
            Category::Acknowledge => "acknowledge",
            Category::Permission => "permission",
            Category::Complete => "complete",
            Category::Error => "error",
            Category::Annoyed => "annoyed",
        }
    }

    /// Short human label for the agent state (used in log lines)
    pub fn label(&self) -> &'static str {
        match self {
            Category::Greeting => "Ready",
            Category::Acknowledge => "Working",
            Category::Permission => "Needs input",
            Category::Complete => "Done",
            Category::Error => "Error",
            Category::Annoyed => "...",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a token is not one of the known categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sound category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Exact, case-sensitive match. Tokens are never trimmed or lowercased.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Returns true if `value` is exactly one of the category tokens.
pub fn is_valid_category(value: &str) -> bool {
    value.parse::<Category>().is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_pack() -> String {
    "peon".to_string()
}

fn default_packs_directory() -> String {
    "~/.remote-peon/packs".to_string()
}

fn default_event_file() -> String {
    "/tmp/remote-peon.ev".to_string()
}

fn default_volume() -> f32 {
    0.7
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_polling_interval_ms() -> u64 {
    500
}

fn default_relay_bind() -> String {
    "127.0.0.1:47831".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    300
}

/// Which audio delivery strategy the host should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Relay when the host detects a remote session, native otherwise
    #[default]
    Auto,
    /// Always invoke the platform's native player
    Direct,
    /// Always play through the relay page
    Relay,
}

/// Per-category enable flags. Everything is on except routine acknowledgments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    #[serde(default = "default_true")]
    pub greeting: bool,
    #[serde(default)]
    pub acknowledge: bool,
    #[serde(default = "default_true")]
    pub permission: bool,
    #[serde(default = "default_true")]
    pub complete: bool,
    #[serde(default = "default_true")]
    pub error: bool,
    #[serde(default = "default_true")]
    pub annoyed: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            greeting: true,
            acknowledge: false,
            permission: true,
            complete: true,
            error: true,
            annoyed: true,
        }
    }
}

impl CategoryToggles {
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Greeting => self.greeting,
            Category::Acknowledge => self.acknowledge,
            Category::Permission => self.permission,
            Category::Complete => self.complete,
            Category::Error => self.error,
            Category::Annoyed => self.annoyed,
        }
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        let slot = match category {
            Category::Greeting => &mut self.greeting,
            Category::Acknowledge => &mut self.acknowledge,
            Category::Permission => &mut self.permission,
            Category::Complete => &mut self.complete,
            Category::Error => &mut self.error,
            Category::Annoyed => &mut self.annoyed,
        };
        *slot = enabled;
    }
}

/// Settings for the relay audio page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Loopback address the relay page is served on
    #[serde(default = "default_relay_bind")]
    pub bind: String,

    /// Seconds without a play request before the page server shuts down
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Open the page in a browser when playback needs to be unlocked
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind: default_relay_bind(),
            idle_timeout_secs: default_idle_timeout_secs(),
            open_browser: true,
        }
    }
}

/// Immutable configuration snapshot.
///
/// Hosts rebuild a fresh snapshot whenever the settings change and hand it by
/// reference to each component; nothing mutates it in place.
///
/// Note: Persistence (load/save) and path expansion are provided by peon-core
/// via the `PeonConfigExt` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeonConfig {
    /// Active sound pack id
    #[serde(default = "default_pack")]
    pub pack: String,

    /// Directory holding one subdirectory per pack. A leading `~` is expanded.
    #[serde(default = "default_packs_directory")]
    pub packs_directory: String,

    /// Signal file written by the agent hook. A leading `~` is expanded.
    #[serde(default = "default_event_file")]
    pub event_file: String,

    /// Playback volume (0.0 - 1.0). Out-of-range values are clamped on read.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Minimum milliseconds between two accepted events
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Poll the signal file instead of relying on change notification
    #[serde(default)]
    pub use_polling: bool,

    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    #[serde(default)]
    pub delivery: DeliveryMode,

    #[serde(default)]
    pub sounds: CategoryToggles,

    #[serde(default)]
    pub relay: RelaySettings,
}

impl Default for PeonConfig {
    fn default() -> Self {
        Self {
            pack: default_pack(),
            packs_directory: default_packs_directory(),
            event_file: default_event_file(),
            volume: default_volume(),
            debounce_ms: default_debounce_ms(),
            use_polling: false,
            polling_interval_ms: default_polling_interval_ms(),
            delivery: DeliveryMode::default(),
            sounds: CategoryToggles::default(),
            relay: RelaySettings::default(),
        }
    }
}

impl PeonConfig {
    /// Volume clamped to 0.0 - 1.0. NaN is treated as silence.
    pub fn effective_volume(&self) -> f32 {
        if self.volume.is_nan() {
            return 0.0;
        }
        self.volume.clamp(0.0, 1.0)
    }

    pub fn is_category_enabled(&self, category: Category) -> bool {
        self.sounds.is_enabled(category)
    }
}
