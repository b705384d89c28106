//! Sound pack loading
//!
//! A pack is a directory with a `manifest.json` and a `sounds/` subdirectory:
//!
//! ```text
//! packs/peon/
//! ├── manifest.json
//! └── sounds/
//!     ├── greeting_1.mp3
//!     └── ...
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::PackError;
use crate::Category;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SOUNDS_DIR: &str = "sounds";

/// A loaded sound pack. Immutable once built; replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundPack {
    pub id: String,
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Absolute pack directory
    pub dir: PathBuf,
    /// Category -> absolute paths of files that existed at load time.
    /// Categories with no surviving files are absent.
    pub sounds: HashMap<Category, Vec<PathBuf>>,
}

impl SoundPack {
    /// Files for a category, empty when the pack has none
    pub fn sounds_for(&self, category: Category) -> &[PathBuf] {
        self.sounds.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if at least one category has a playable file
    pub fn has_sounds(&self) -> bool {
        self.sounds.values().any(|files| !files.is_empty())
    }
}

/// Entry returned by [`list_packs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub id: String,
    pub name: String,
    pub dir: PathBuf,
}

/// Raw manifest. Text fields stay loosely typed so a wrong type on an optional
/// field is ignored instead of rejecting the pack.
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: Value,
    #[serde(default)]
    author: Value,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    sounds: Option<serde_json::Map<String, Value>>,
}

impl Manifest {
    fn read(path: &Path) -> Result<Self, PackError> {
        let content = fs::read_to_string(path).map_err(|source| PackError::ReadManifest {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PackError::ParseManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    fn id(&self) -> Option<&str> {
        non_empty_str(&self.id)
    }

    /// Display name, falling back to the id
    fn name_or(&self, id: &str) -> String {
        non_empty_str(&self.name).unwrap_or(id).to_string()
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// Load a pack, logging and returning `None` when the directory is not a valid pack.
pub fn load_pack(pack_dir: &Path) -> Option<SoundPack> {
    match read_pack(pack_dir) {
        Ok(pack) => {
            tracing::info!(
                pack = %pack.id,
                categories = pack.sounds.len(),
                "Loaded sound pack"
            );
            Some(pack)
        }
        Err(e @ PackError::MissingManifest { .. }) => {
            tracing::warn!("{e}");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, source = ?std::error::Error::source(&e), "Invalid sound pack");
            None
        }
    }
}

/// Load a pack, reporting why it failed.
///
/// Files referenced by the manifest but missing on disk are dropped with a
/// warning; that is never an error.
pub fn read_pack(pack_dir: &Path) -> Result<SoundPack, PackError> {
    let dir = std::path::absolute(pack_dir).unwrap_or_else(|_| pack_dir.to_path_buf());
    let manifest_path = dir.join(MANIFEST_FILE);

    if !manifest_path.is_file() {
        return Err(PackError::MissingManifest { dir });
    }

    let manifest = Manifest::read(&manifest_path)?;

    let Some(id) = manifest.id().map(str::to_string) else {
        return Err(PackError::MissingId {
            path: manifest_path,
        });
    };
    let Some(entries) = manifest.sounds.as_ref() else {
        return Err(PackError::MissingSounds {
            path: manifest_path,
        });
    };

    let sounds_dir = dir.join(SOUNDS_DIR);
    let mut sounds = HashMap::new();

    for category in Category::ALL {
        let resolved = resolve_files(&sounds_dir, entries.get(category.as_str()));
        if !resolved.is_empty() {
            sounds.insert(category, resolved);
        }
    }

    Ok(SoundPack {
        name: manifest.name_or(&id),
        author: non_empty_str(&manifest.author).map(str::to_string),
        description: non_empty_str(&manifest.description).map(str::to_string),
        id,
        dir,
        sounds,
    })
}

/// Resolve one category's filename list against `sounds/`, keeping files that exist
fn resolve_files(sounds_dir: &Path, entry: Option<&Value>) -> Vec<PathBuf> {
    let Some(Value::Array(files)) = entry else {
        return Vec::new();
    };

    files
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|file| {
            if !is_plain_relative(file) {
                tracing::warn!(file, "Sound file must be relative to the sounds directory");
                return None;
            }
            let full_path = sounds_dir.join(file);
            if full_path.is_file() {
                Some(full_path)
            } else {
                tracing::warn!(path = %full_path.display(), "Sound file not found");
                None
            }
        })
        .collect()
}

fn is_plain_relative(file: &str) -> bool {
    let path = Path::new(file);
    !file.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// List the packs available under `packs_dir`, ordered by directory name.
///
/// A missing directory yields an empty list. Subdirectories without a readable
/// manifest carrying an id are skipped.
pub fn list_packs(packs_dir: &Path) -> Vec<PackSummary> {
    let entries = match fs::read_dir(packs_dir) {
        Ok(entries) => entries,
        Err(e) => {
            if packs_dir.exists() {
                tracing::warn!(dir = %packs_dir.display(), error = %e, "Failed to read packs directory");
            }
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|dir| {
            let manifest_path = dir.join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                return None;
            }
            let manifest = match Manifest::read(&manifest_path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping pack with invalid manifest");
                    return None;
                }
            };
            let id = manifest.id()?.to_string();
            Some(PackSummary {
                name: manifest.name_or(&id),
                id,
                dir,
            })
        })
        .collect()
}
