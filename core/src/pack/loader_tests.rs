//! Tests for manifest parsing and pack discovery

use std::fs;
use std::path::{Path, PathBuf};

use super::{PackError, list_packs, load_pack, read_pack};
use crate::Category;

/// Create a pack directory with the given manifest and empty sound files
fn make_pack(root: &Path, dir_name: &str, manifest: &str, files: &[&str]) -> PathBuf {
    let pack_dir = root.join(dir_name);
    fs::create_dir_all(pack_dir.join("sounds")).unwrap();
    fs::write(pack_dir.join("manifest.json"), manifest).unwrap();
    for file in files {
        fs::write(pack_dir.join("sounds").join(file), b"ID3").unwrap();
    }
    pack_dir
}

#[test]
fn test_load_full_manifest() {
    let root = tempfile::tempdir().unwrap();
    let dir = make_pack(
        root.path(),
        "peon",
        r#"{
            "id": "peon",
            "name": "Orc Peon",
            "author": "Blizzard",
            "description": "Work work.",
            "sounds": {
                "greeting": ["ready.mp3"],
                "complete": ["done1.mp3", "done2.mp3"]
            }
        }"#,
        &["ready.mp3", "done1.mp3", "done2.mp3"],
    );

    let pack = load_pack(&dir).expect("pack should load");
    assert_eq!(pack.id, "peon");
    assert_eq!(pack.name, "Orc Peon");
    assert_eq!(pack.author.as_deref(), Some("Blizzard"));
    assert_eq!(pack.description.as_deref(), Some("Work work."));
    assert_eq!(
        pack.sounds_for(Category::Complete),
        &[dir.join("sounds/done1.mp3"), dir.join("sounds/done2.mp3")]
    );
    assert_eq!(pack.sounds_for(Category::Greeting), &[dir.join("sounds/ready.mp3")]);
    assert!(pack.sounds_for(Category::Error).is_empty());
    assert!(pack.has_sounds());
    assert!(pack.sounds_for(Category::Complete).iter().all(|p| p.is_absolute()));
}

#[test]
fn test_missing_files_are_dropped() {
    let root = tempfile::tempdir().unwrap();
    let dir = make_pack(
        root.path(),
        "t",
        r#"{
            "id": "t",
            "sounds": {
                "complete": ["here.mp3", "gone.mp3"],
                "error": ["missing1.mp3", "missing2.mp3"]
            }
        }"#,
        &["here.mp3"],
    );

    let pack = load_pack(&dir).unwrap();
    assert_eq!(pack.sounds_for(Category::Complete), &[dir.join("sounds/here.mp3")]);
    assert!(!pack.sounds.contains_key(&Category::Error));
}

#[test]
fn test_name_defaults_to_id() {
    let root = tempfile::tempdir().unwrap();
    let dir = make_pack(root.path(), "x", r#"{"id": "x", "sounds": {}}"#, &[]);

    let pack = load_pack(&dir).unwrap();
    assert_eq!(pack.name, "x");
    assert!(pack.author.is_none());
    assert!(!pack.has_sounds());
}

#[test]
fn test_non_string_metadata_is_ignored() {
    let root = tempfile::tempdir().unwrap();
    let dir = make_pack(
        root.path(),
        "odd",
        r#"{"id": "odd", "name": 3, "author": ["a"], "description": "Zug zug", "sounds": {}}"#,
        &[],
    );

    let pack = load_pack(&dir).unwrap();
    assert_eq!(pack.name, "odd");
    assert!(pack.author.is_none());
    assert_eq!(pack.description.as_deref(), Some("Zug zug"));

    let listed = list_packs(root.path());
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "odd");
}

#[test]
fn test_tolerates_odd_category_entries() {
    let root = tempfile::tempdir().unwrap();
    let dir = make_pack(
        root.path(),
        "odd",
        r#"{
            "id": "odd",
            "sounds": {
                "greeting": "not-a-list.mp3",
                "complete": ["ok.mp3", 42, null],
                "error": ["../escape.mp3", "/etc/passwd"],
                "dance": ["ok.mp3"]
            }
        }"#,
        &["ok.mp3", "not-a-list.mp3"],
    );

    let pack = load_pack(&dir).unwrap();
    assert!(!pack.sounds.contains_key(&Category::Greeting));
    assert_eq!(pack.sounds_for(Category::Complete), &[dir.join("sounds/ok.mp3")]);
    assert!(!pack.sounds.contains_key(&Category::Error));
    assert_eq!(pack.sounds.len(), 1);
}

#[test]
fn test_invalid_manifests_return_none() {
    let root = tempfile::tempdir().unwrap();

    let no_manifest = root.path().join("empty");
    fs::create_dir_all(&no_manifest).unwrap();
    assert!(load_pack(&no_manifest).is_none());
    assert!(matches!(
        read_pack(&no_manifest),
        Err(PackError::MissingManifest { .. })
    ));

    let bad_json = make_pack(root.path(), "bad", "{ not json", &[]);
    assert!(matches!(read_pack(&bad_json), Err(PackError::ParseManifest { .. })));
    assert!(load_pack(&bad_json).is_none());

    let no_id = make_pack(root.path(), "noid", r#"{"sounds": {}}"#, &[]);
    assert!(matches!(read_pack(&no_id), Err(PackError::MissingId { .. })));

    let empty_id = make_pack(root.path(), "emptyid", r#"{"id": "", "sounds": {}}"#, &[]);
    assert!(matches!(read_pack(&empty_id), Err(PackError::MissingId { .. })));

    let no_sounds = make_pack(root.path(), "nosounds", r#"{"id": "n"}"#, &[]);
    assert!(matches!(read_pack(&no_sounds), Err(PackError::MissingSounds { .. })));

    assert!(load_pack(&root.path().join("does-not-exist")).is_none());
}

#[test]
fn test_list_packs_skips_invalid_entries() {
    let root = tempfile::tempdir().unwrap();
    make_pack(root.path(), "b-peon", r#"{"id": "peon", "name": "Orc Peon", "sounds": {}}"#, &[]);
    make_pack(root.path(), "a-glados", r#"{"id": "glados", "sounds": {}}"#, &[]);
    make_pack(root.path(), "c-broken", "{{{", &[]);
    make_pack(root.path(), "d-anonymous", r#"{"name": "No Id"}"#, &[]);
    fs::create_dir_all(root.path().join("e-no-manifest")).unwrap();
    fs::write(root.path().join("stray.json"), "{}").unwrap();

    let packs = list_packs(root.path());
    let ids: Vec<_> = packs.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["glados", "peon"]);

    assert_eq!(packs[0].name, "glados");
    assert_eq!(packs[1].name, "Orc Peon");
    assert_eq!(packs[1].dir, root.path().join("b-peon"));
}

#[test]
fn test_list_packs_missing_directory_is_empty() {
    let root = tempfile::tempdir().unwrap();
    assert!(list_packs(&root.path().join("nope")).is_empty());
}
