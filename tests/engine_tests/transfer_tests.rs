//! Tests for backup, archive and restore transfers
//!
//! These tests verify:
//! - Files and manifest entries land in the destination
//! - Source handling per transfer kind (copy vs move)
//! - Every location verifies clean after a committed transfer
//! - Preflight failures touch nothing
//! - Save names with inner dots keep their own entries

use std::fs;

use baron_builder::manifest::load_manifest;
use baron_builder::storage::LocationKind;
use baron_builder::transfer::{TransferKind, TransferState};
use baron_builder::{BaronError, Operation, Outcome, RestoreSource};
use serde_json::json;
use zip::CompressionMethod;

use super::{read_container, read_json, setup_game, write_save};

// =============================================================================
// Backup
// =============================================================================

#[test]
fn test_backup_into_empty_store() {
    let game = setup_game();
    let mut engine = game.open();

    let report = engine.backup("hero.zks").unwrap();

    assert_eq!(report.kind, TransferKind::Backup);
    assert_eq!(report.state, TransferState::Committed);
    assert_eq!(report.destination, game.backup_dir().join("hero.bbb"));
    assert_eq!(
        read_json(&game.backup_dir().join("backup.json")),
        json!({"Version": 3, "Files": [{"Filename": "hero.bbb", "Version": 3}]})
    );
    assert_eq!(
        fs::read(game.backup_dir().join("hero.bbb")).unwrap(),
        fs::read(game.save("hero.zks")).unwrap()
    );
    // Live side untouched
    assert_eq!(load_manifest(&game.live_manifest).unwrap().files.len(), 1);
    assert!(engine.verify_all().unwrap().is_ok());
}

#[test]
fn test_backup_accepts_bare_stem() {
    let game = setup_game();
    let mut engine = game.open();

    let outcome = engine
        .execute(Operation::Backup {
            filename: "hero".to_string(),
        })
        .unwrap();

    assert!(matches!(outcome, Outcome::Transferred(_)));
    assert!(game.backup_dir().join("hero.bbb").is_file());
}

#[test]
fn test_backup_twice_keeps_one_entry() {
    let game = setup_game();
    let mut engine = game.open();

    let first = engine.backup("hero.zks").unwrap();
    let second = engine.backup("hero.zks").unwrap();

    assert_eq!(second.transfer_id, first.transfer_id + 1);
    let manifest = load_manifest(&game.backup_dir().join("backup.json")).unwrap();
    assert_eq!(manifest.files.len(), 1);
}

// =============================================================================
// Archive
// =============================================================================

#[test]
fn test_archive_moves_save_and_entry() {
    let game = setup_game();
    let mut engine = game.open();

    engine.archive("hero.zks").unwrap();

    assert!(!game.save("hero.zks").exists());
    let archived = game.archive_dir().join("hero.bba");
    assert!(read_container(&archived)
        .iter()
        .all(|(_, _, method)| *method == CompressionMethod::Bzip2));
    assert_eq!(
        read_json(&game.live_manifest),
        json!({"Version": 3, "Files": []})
    );
    assert_eq!(
        read_json(&game.archive_dir().join("archive.json")),
        json!({"Version": 3, "Files": [{"Filename": "hero.bba", "Version": 3}]})
    );
    // Working directory was created for this archive and removed again
    assert!(!game.tool_dir().join("Working").join("hero").exists());
    assert!(engine.verify_all().unwrap().is_ok());
}

#[test]
fn test_archive_keeps_preexisting_working_dir() {
    let game = setup_game();
    let mut engine = game.open();
    engine.unpack("hero").unwrap();

    engine.archive("hero").unwrap();

    assert!(game.tool_dir().join("Working").join("hero").is_dir());
}

// =============================================================================
// Restore
// =============================================================================

#[test]
fn test_archive_then_restore_round_trip() {
    let game = setup_game();
    let original = read_container(&game.save("hero.zks"));
    let mut engine = game.open();

    engine.archive("hero.zks").unwrap();
    let report = engine.restore("hero.bba", RestoreSource::Archive).unwrap();

    assert_eq!(report.kind, TransferKind::RestoreArchive);
    let restored = read_container(&game.save("hero.zks"));
    let names: Vec<&str> = restored.iter().map(|m| m.0.as_str()).collect();
    assert_eq!(names, vec!["header.json", "party.json", "player.json", "statistic.json"]);
    for ((_, bytes, method), (_, original_bytes, _)) in restored.iter().zip(&original) {
        assert_eq!(bytes, original_bytes);
        assert_eq!(*method, CompressionMethod::Deflated);
    }

    let live = load_manifest(&game.live_manifest).unwrap();
    assert!(live.version >= 3);
    assert_eq!(live.files[0].filename, "hero.zks");
    assert!(!game.archive_dir().join("hero.bba").exists());
    assert!(load_manifest(&game.archive_dir().join("archive.json"))
        .unwrap()
        .files
        .is_empty());
    assert!(engine.verify_all().unwrap().is_ok());
}

#[test]
fn test_restore_from_backup_leaves_backup() {
    let game = setup_game();
    let original = fs::read(game.save("hero.zks")).unwrap();
    let mut engine = game.open();
    engine.backup("hero.zks").unwrap();

    // Lose the live save and its entry
    fs::remove_file(game.save("hero.zks")).unwrap();
    fs::write(&game.live_manifest, r#"{"Version":3,"Files":[]}"#).unwrap();

    engine.restore("hero", RestoreSource::Backup).unwrap();

    assert_eq!(fs::read(game.save("hero.zks")).unwrap(), original);
    assert_eq!(
        read_json(&game.live_manifest)["Files"],
        json!([{"Filename": "hero.zks", "Version": 3}])
    );
    assert!(game.backup_dir().join("hero.bbb").is_file());
    assert_eq!(engine.list(LocationKind::Backup).unwrap().len(), 1);
    assert!(engine.verify_all().unwrap().is_ok());
}

#[test]
fn test_restore_overwrites_live_save() {
    let game = setup_game();
    let original = fs::read(game.save("hero.zks")).unwrap();
    let mut engine = game.open();
    engine.backup("hero").unwrap();
    fs::write(game.save("hero.zks"), b"clobbered").unwrap();

    engine.restore("hero", RestoreSource::Backup).unwrap();

    assert_eq!(fs::read(game.save("hero.zks")).unwrap(), original);
}

// =============================================================================
// Preflight
// =============================================================================

#[test]
fn test_missing_source_file_touches_nothing() {
    let game = setup_game();
    let mut engine = game.open();

    let result = engine.backup("ghost.zks");

    assert!(matches!(result, Err(BaronError::NotFound(_))));
    assert!(engine.list(LocationKind::Backup).unwrap().is_empty());
}

#[test]
fn test_missing_manifest_entry_touches_nothing() {
    let game = setup_game();
    fs::copy(game.save("hero.zks"), game.save("ghost.zks")).unwrap();
    let mut engine = game.open();

    let result = engine.archive("ghost.zks");

    match result {
        Err(BaronError::EntryNotFound { filename, .. }) => assert_eq!(filename, "ghost.zks"),
        other => panic!("expected EntryNotFound, got {:?}", other),
    }
    assert!(game.save("ghost.zks").is_file());
    assert!(!game.archive_dir().join("ghost.bba").exists());
}

#[test]
fn test_restore_without_archive() {
    let game = setup_game();
    let mut engine = game.open();

    let result = engine.restore("hero", RestoreSource::Archive);
    assert!(matches!(result, Err(BaronError::NotFound(_))));
}

#[test]
fn test_path_filename_rejected() {
    let game = setup_game();
    let mut engine = game.open();

    assert!(matches!(engine.backup("../hero.zks"), Err(BaronError::Validation(_))));
    assert!(matches!(engine.backup(""), Err(BaronError::Validation(_))));
}

// =============================================================================
// Dotted Save Names
// =============================================================================

#[test]
fn test_backup_save_name_with_inner_dots() {
    let game = setup_game();
    write_save(&game.save("Manual_4.2_Arodus.zks"));
    fs::write(
        &game.live_manifest,
        r#"{"Version":4,"Files":[{"Filename":"hero.zks","Version":3},{"Filename":"Manual_4.2_Arodus.zks","Version":4}]}"#,
    )
    .unwrap();
    let mut engine = game.open();

    let report = engine.backup("Manual_4.2_Arodus.zks").unwrap();

    assert_eq!(report.destination, game.backup_dir().join("Manual_4.2_Arodus.bbb"));
    assert_eq!(
        read_json(&game.backup_dir().join("backup.json")),
        json!({"Version": 4, "Files": [{"Filename": "Manual_4.2_Arodus.bbb", "Version": 4}]})
    );
    assert!(engine.verify_all().unwrap().is_ok());
}

#[test]
fn test_archive_dotted_name_leaves_shorter_stem_alone() {
    let game = setup_game();
    write_save(&game.save("a.zks"));
    write_save(&game.save("a.b.zks"));
    fs::write(
        &game.live_manifest,
        r#"{"Version":3,"Files":[{"Filename":"hero.zks","Version":3},{"Filename":"a.zks","Version":2},{"Filename":"a.b.zks","Version":3}]}"#,
    )
    .unwrap();
    let mut engine = game.open();

    let report = engine.archive("a.b.zks").unwrap();

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].filename, "a.b.bba");
    assert_eq!(report.entries[0].version, 3);
    assert!(game.archive_dir().join("a.b.bba").is_file());
    assert!(game.save("a.zks").is_file());
    assert!(!game.save("a.b.zks").exists());

    let live = load_manifest(&game.live_manifest).unwrap();
    let names: Vec<_> = live.files.iter().map(|e| e.filename.as_str()).collect();
    assert_eq!(names, vec!["hero.zks", "a.zks"]);
    assert_eq!(
        read_json(&game.archive_dir().join("archive.json")),
        json!({"Version": 3, "Files": [{"Filename": "a.b.bba", "Version": 3}]})
    );
    assert!(engine.verify_all().unwrap().is_ok());
}

#[test]
fn test_restore_dotted_name_given_as_bare_stem() {
    let game = setup_game();
    write_save(&game.save("Manual_4.2_Arodus.zks"));
    fs::write(
        &game.live_manifest,
        r#"{"Version":4,"Files":[{"Filename":"hero.zks","Version":3},{"Filename":"Manual_4.2_Arodus.zks","Version":4}]}"#,
    )
    .unwrap();
    let mut engine = game.open();
    engine.archive("Manual_4.2_Arodus").unwrap();

    let report = engine
        .restore("Manual_4.2_Arodus", RestoreSource::Archive)
        .unwrap();

    assert_eq!(report.destination, game.save("Manual_4.2_Arodus.zks"));
    assert!(!game.archive_dir().join("Manual_4.2_Arodus.bba").exists());
    assert!(engine.verify_all().unwrap().is_ok());
}
