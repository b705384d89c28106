//! Sound selection policy
//!
//! Picks which file to play for a category: honours per-category enable flags,
//! falls back from `complete` to `acknowledge`, and never returns the same file
//! twice in a row for a category that has more than one.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::context::{PeonConfig, PeonConfigExt};
use crate::pack::{SoundPack, list_packs, load_pack};
use crate::Category;

pub struct SoundSelector {
    pack: Option<SoundPack>,
    /// Last file returned per category. Scoped to the loaded pack.
    last_played: HashMap<Category, PathBuf>,
    rng: StdRng,
}

impl SoundSelector {
    /// Create a selector and load the pack named by `config`
    pub fn new(config: &PeonConfig) -> Self {
        let mut selector = Self::empty();
        selector.reload(config);
        selector
    }

    /// Selector with no pack; every pick returns `None` until a reload
    pub fn empty() -> Self {
        Self {
            pack: None,
            last_played: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Selector over an already loaded pack
    pub fn with_pack(pack: SoundPack) -> Self {
        Self {
            pack: Some(pack),
            ..Self::empty()
        }
    }

    /// Deterministic random source, for reproducible tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Drop the current pack and load the one `config` names.
    ///
    /// An unknown pack id leaves the selector with no pack.
    pub fn reload(&mut self, config: &PeonConfig) {
        self.pack = None;
        self.last_played.clear();

        let packs_dir = config.packs_dir();
        let packs = list_packs(&packs_dir);

        let Some(found) = packs.iter().find(|p| p.id == config.pack) else {
            let available: Vec<&str> = packs.iter().map(|p| p.id.as_str()).collect();
            tracing::warn!(
                pack = %config.pack,
                dir = %packs_dir.display(),
                available = ?available,
                "Configured sound pack not found"
            );
            return;
        };

        self.pack = load_pack(&found.dir);
    }

    /// Pick the file to play for `category`, or `None` if nothing should play
    pub fn pick_sound(&mut self, category: Category, config: &PeonConfig) -> Option<PathBuf> {
        if !config.is_category_enabled(category) {
            return None;
        }

        let pack = self.pack.as_ref()?;

        let mut files = pack.sounds_for(category);
        if files.is_empty() && category == Category::Complete {
            files = pack.sounds_for(Category::Acknowledge);
        }

        match files {
            [] => None,
            [only] => Some(only.clone()),
            _ => {
                let last = self.last_played.get(&category);
                let candidates: Vec<&PathBuf> =
                    files.iter().filter(|f| Some(*f) != last).collect();
                let pick = (*candidates.choose(&mut self.rng)?).clone();
                self.last_played.insert(category, pick.clone());
                Some(pick)
            }
        }
    }

    pub fn active_pack(&self) -> Option<&SoundPack> {
        self.pack.as_ref()
    }

    /// True if a pack is loaded and has at least one sound
    pub fn is_ready(&self) -> bool {
        self.pack.as_ref().is_some_and(SoundPack::has_sounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn pack_with(sounds: &[(Category, &[&str])]) -> SoundPack {
        SoundPack {
            id: "test".to_string(),
            name: "Test".to_string(),
            author: None,
            description: None,
            dir: PathBuf::from("/packs/test"),
            sounds: sounds
                .iter()
                .map(|(category, files)| {
                    (
                        *category,
                        files
                            .iter()
                            .map(|f| PathBuf::from("/packs/test/sounds").join(f))
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    fn all_enabled() -> PeonConfig {
        let mut config = PeonConfig::default();
        for category in Category::ALL {
            config.sounds.set(category, true);
        }
        config
    }

    #[test]
    fn test_single_file_always_returned() {
        let mut selector =
            SoundSelector::with_pack(pack_with(&[(Category::Error, &["oops.mp3"])]));
        let config = all_enabled();

        for _ in 0..10 {
            assert_eq!(
                selector.pick_sound(Category::Error, &config),
                Some(PathBuf::from("/packs/test/sounds/oops.mp3"))
            );
        }
    }

    #[test]
    fn test_no_consecutive_repeats() {
        let mut selector = SoundSelector::with_pack(pack_with(&[(
            Category::Greeting,
            &["a.mp3", "b.mp3", "c.mp3"],
        )]))
        .with_seed(7);
        let config = all_enabled();

        let mut previous = selector.pick_sound(Category::Greeting, &config).unwrap();
        for _ in 0..100 {
            let next = selector.pick_sound(Category::Greeting, &config).unwrap();
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_repeat_tracking_is_per_category() {
        let mut selector = SoundSelector::with_pack(pack_with(&[
            (Category::Greeting, &["a.mp3", "b.mp3"]),
            (Category::Error, &["a.mp3", "b.mp3"]),
        ]));
        let config = all_enabled();

        let greeting = selector.pick_sound(Category::Greeting, &config).unwrap();
        // Another category's history never constrains this one
        let mut error_picks = Vec::new();
        for _ in 0..20 {
            error_picks.push(selector.pick_sound(Category::Error, &config).unwrap());
        }
        assert!(error_picks.windows(2).all(|w| w[0] != w[1]));
        assert_ne!(selector.pick_sound(Category::Greeting, &config).unwrap(), greeting);
    }

    #[test]
    fn test_complete_falls_back_to_acknowledge() {
        let mut selector = SoundSelector::with_pack(pack_with(&[(
            Category::Acknowledge,
            &["ack.mp3"],
        )]));
        let config = all_enabled();

        assert_eq!(
            selector.pick_sound(Category::Complete, &config),
            Some(PathBuf::from("/packs/test/sounds/ack.mp3"))
        );
    }

    #[test]
    fn test_fallback_ignores_acknowledge_toggle() {
        let mut selector = SoundSelector::with_pack(pack_with(&[(
            Category::Acknowledge,
            &["ack.mp3"],
        )]));
        // Default config: acknowledge disabled, complete enabled
        let config = PeonConfig::default();

        assert!(selector.pick_sound(Category::Acknowledge, &config).is_none());
        assert!(selector.pick_sound(Category::Complete, &config).is_some());
    }

    #[test]
    fn test_complete_and_acknowledge_both_empty() {
        let mut selector =
            SoundSelector::with_pack(pack_with(&[(Category::Error, &["oops.mp3"])]));
        assert!(selector.pick_sound(Category::Complete, &all_enabled()).is_none());
    }

    #[test]
    fn test_only_complete_falls_back() {
        let mut selector = SoundSelector::with_pack(pack_with(&[(
            Category::Acknowledge,
            &["ack.mp3"],
        )]));
        assert!(selector.pick_sound(Category::Error, &all_enabled()).is_none());
    }

    #[test]
    fn test_disabled_category_returns_none() {
        let mut selector =
            SoundSelector::with_pack(pack_with(&[(Category::Error, &["oops.mp3"])]));
        let mut config = all_enabled();
        config.sounds.set(Category::Error, false);

        assert!(selector.pick_sound(Category::Error, &config).is_none());
    }

    #[test]
    fn test_no_pack_returns_none() {
        let mut selector = SoundSelector::empty();
        assert!(!selector.is_ready());
        for category in Category::ALL {
            assert!(selector.pick_sound(category, &all_enabled()).is_none());
        }
    }

    fn write_pack(root: &Path, dir_name: &str, manifest: &str, files: &[&str]) {
        let dir = root.join(dir_name);
        fs::create_dir_all(dir.join("sounds")).unwrap();
        fs::write(dir.join("manifest.json"), manifest).unwrap();
        for file in files {
            fs::write(dir.join("sounds").join(file), b"").unwrap();
        }
    }

    #[test]
    fn test_scenario_twenty_picks_alternate() {
        let root = tempfile::tempdir().unwrap();
        write_pack(
            root.path(),
            "t",
            r#"{"id":"t","sounds":{"complete":["done1.mp3","done2.mp3"]}}"#,
            &["done1.mp3", "done2.mp3"],
        );

        let mut config = PeonConfig::default();
        config.pack = "t".to_string();
        config.packs_directory = root.path().to_string_lossy().to_string();

        let mut selector = SoundSelector::new(&config);
        assert!(selector.is_ready());

        let expected = [
            root.path().join("t/sounds/done1.mp3"),
            root.path().join("t/sounds/done2.mp3"),
        ];

        let picks: Vec<PathBuf> = (0..20)
            .map(|_| selector.pick_sound(Category::Complete, &config).unwrap())
            .collect();

        assert!(picks.iter().all(|p| expected.contains(p)));
        assert!(picks.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_reload_switches_pack_and_unknown_id_clears() {
        let root = tempfile::tempdir().unwrap();
        write_pack(
            root.path(),
            "one",
            r#"{"id":"one","sounds":{"error":["x.mp3"]}}"#,
            &["x.mp3"],
        );
        write_pack(
            root.path(),
            "two",
            r#"{"id":"two","sounds":{"error":["y.mp3"]}}"#,
            &["y.mp3"],
        );

        let mut config = PeonConfig::default();
        config.pack = "one".to_string();
        config.packs_directory = root.path().to_string_lossy().to_string();

        let mut selector = SoundSelector::new(&config);
        assert_eq!(selector.active_pack().map(|p| p.id.as_str()), Some("one"));

        let next = PeonConfig {
            pack: "two".to_string(),
            ..config.clone()
        };
        selector.reload(&next);
        assert_eq!(
            selector.pick_sound(Category::Error, &next),
            Some(root.path().join("two/sounds/y.mp3"))
        );

        let missing = PeonConfig {
            pack: "three".to_string(),
            ..config
        };
        selector.reload(&missing);
        assert!(selector.active_pack().is_none());
        assert!(selector.pick_sound(Category::Error, &missing).is_none());
    }
}
