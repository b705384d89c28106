mod selector;

pub use selector::SoundSelector;
