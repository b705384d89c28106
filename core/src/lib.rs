pub mod audio;
pub mod context;
pub mod event;
pub mod pack;
pub mod sound;

// Re-exports for convenience
pub use audio::{AudioBackend, NativeBackend, PlaybackRequest, RelayBackend, RelayNotice, create_backend};
pub use context::{PeonConfig, PeonConfigExt};
pub use event::{AgentEvent, EventSource, WatchMode, parse_event_line};
pub use pack::{PackSummary, SoundPack, list_packs, load_pack};
pub use peon_types::{Category, UnknownCategory, is_valid_category};
pub use sound::SoundSelector;
