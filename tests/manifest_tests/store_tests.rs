//! Tests for extract, remove and merge
//!
//! These tests verify:
//! - Extension-insensitive matching
//! - Monotonic versions
//! - Writes skipped when nothing changed

use std::fs;

use baron_builder::manifest::{
    extract_entry, load_manifest, merge_entries, remove_entry, ManifestEntry, ManifestStore,
};
use baron_builder::BaronError;

use super::setup_manifest;

const TWO_SAVES: &str = r#"{"Version":4,"Files":[{"Filename":"save1.zks","Version":4},{"Filename":"save2.zks","Version":2}]}"#;

// =============================================================================
// Extract / Remove
// =============================================================================

#[test]
fn test_extract_matches_by_stem() {
    let (_temp, path) = setup_manifest(TWO_SAVES);

    let entries = extract_entry(&path, "save1.bba").unwrap();

    assert_eq!(entries, vec![ManifestEntry::new("save1.zks", 4)]);
    // Extract copies; the manifest is unchanged
    assert_eq!(load_manifest(&path).unwrap().files.len(), 2);
}

#[test]
fn test_extract_no_match_is_empty() {
    let (_temp, path) = setup_manifest(TWO_SAVES);
    assert!(extract_entry(&path, "save10.zks").unwrap().is_empty());
}

#[test]
fn test_remove_persists() {
    let (_temp, path) = setup_manifest(TWO_SAVES);

    let removed = remove_entry(&path, "save2").unwrap();

    assert_eq!(removed, vec![ManifestEntry::new("save2.zks", 2)]);
    let manifest = load_manifest(&path).unwrap();
    assert_eq!(manifest.files, vec![ManifestEntry::new("save1.zks", 4)]);
    // Removing never lowers the manifest version
    assert_eq!(manifest.version, 4);
}

#[test]
fn test_remove_nothing_does_not_write() {
    let (_temp, path) = setup_manifest(TWO_SAVES);

    assert!(remove_entry(&path, "other.zks").unwrap().is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), TWO_SAVES);
}

// =============================================================================
// Merge
// =============================================================================

#[test]
fn test_merge_appends_and_raises_version() {
    let (_temp, path) = setup_manifest(r#"{"Version":1,"Files":[]}"#);

    assert!(merge_entries(&path, &[ManifestEntry::new("hero.bbb", 3)]).unwrap());

    let manifest = load_manifest(&path).unwrap();
    assert_eq!(manifest.version, 3);
    assert_eq!(manifest.files, vec![ManifestEntry::new("hero.bbb", 3)]);
}

#[test]
fn test_merge_never_decreases() {
    let (_temp, path) = setup_manifest(TWO_SAVES);

    let changed = merge_entries(&path, &[ManifestEntry::new("save1.zks", 1)]).unwrap();

    assert!(!changed);
    assert_eq!(fs::read_to_string(&path).unwrap(), TWO_SAVES);
    let manifest = load_manifest(&path).unwrap();
    assert_eq!(manifest.version, 4);
    assert_eq!(manifest.files[0].version, 4);
}

#[test]
fn test_merge_raises_existing_entry() {
    let (_temp, path) = setup_manifest(TWO_SAVES);

    merge_entries(&path, &[ManifestEntry::new("save2.zks", 7)]).unwrap();

    let manifest = load_manifest(&path).unwrap();
    assert_eq!(manifest.version, 7);
    assert_eq!(manifest.files[1], ManifestEntry::new("save2.zks", 7));
}

#[test]
fn test_merge_rejects_path_filename() {
    let (_temp, path) = setup_manifest(TWO_SAVES);

    let result = merge_entries(&path, &[ManifestEntry::new("../evil.zks", 9)]);

    assert!(matches!(result, Err(BaronError::Validation(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), TWO_SAVES);
}

// =============================================================================
// Store
// =============================================================================

#[test]
fn test_store_batches_changes_until_flush() {
    let (_temp, path) = setup_manifest(TWO_SAVES);
    let mut store = ManifestStore::new(&path);

    store.remove("save1.zks").unwrap();
    store.merge(&[ManifestEntry::new("save3.zks", 5)]).unwrap();
    assert!(store.is_dirty());
    assert_eq!(fs::read_to_string(&path).unwrap(), TWO_SAVES);

    assert!(store.flush().unwrap());
    assert!(!store.flush().unwrap());

    let manifest = load_manifest(&path).unwrap();
    assert_eq!(
        manifest.files,
        vec![ManifestEntry::new("save2.zks", 2), ManifestEntry::new("save3.zks", 5)]
    );
}

#[test]
fn test_store_discard() {
    let (_temp, path) = setup_manifest(TWO_SAVES);
    let mut store = ManifestStore::new(&path);

    store.remove("save1").unwrap();
    store.discard();

    assert!(!store.is_dirty());
    assert_eq!(store.manifest().unwrap().files.len(), 2);
}
