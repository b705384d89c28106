//! Sound packs: manifest parsing and category -> file resolution

mod error;
mod loader;

#[cfg(test)]
mod loader_tests;

pub use error::PackError;
pub use loader::{MANIFEST_FILE, PackSummary, SOUNDS_DIR, SoundPack, list_packs, load_pack, read_pack};
