//! Tests for engine startup

use std::fs;

use baron_builder::config::Config;
use baron_builder::storage::LocationKind;
use baron_builder::{BaronError, Engine};
use serde_json::json;
use tempfile::TempDir;

use super::{read_json, setup_game};

#[test]
fn test_open_lays_out_tool_directories() {
    let game = setup_game();
    let _engine = game.open();

    assert!(game.backup_dir().is_dir());
    assert!(game.archive_dir().is_dir());
    assert!(game.tool_dir().join("Working").is_dir());
    assert!(game.tool_dir().join("transfer.journal").is_file());
    assert_eq!(
        read_json(&game.backup_dir().join("backup.json")),
        json!({"Version": 1, "Files": []})
    );
    assert_eq!(
        read_json(&game.archive_dir().join("archive.json")),
        json!({"Version": 1, "Files": []})
    );
}

#[test]
fn test_open_copies_live_manifest() {
    let game = setup_game();
    let _engine = game.open();

    assert_eq!(
        fs::read(game.backup_dir().join("manifest.bak")).unwrap(),
        fs::read(&game.live_manifest).unwrap()
    );
}

#[test]
fn test_open_twice_keeps_store_manifests() {
    let game = setup_game();
    let mut engine = game.open();
    engine.backup("hero.zks").unwrap();
    drop(engine);

    let engine = game.open();
    let backups = engine.list(LocationKind::Backup).unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(
        read_json(&game.backup_dir().join("backup.json"))["Files"][0]["Filename"],
        "hero.bbb"
    );
}

#[test]
fn test_open_without_live_manifest() {
    let game = setup_game();
    fs::remove_file(&game.live_manifest).unwrap();

    let mut engine = game.open();

    assert!(!game.live_manifest.exists());
    assert!(matches!(engine.backup("hero"), Err(BaronError::NotFound(_))));
}

#[test]
fn test_open_missing_live_dir() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().live_dir(temp.path().join("nope")).build();

    assert!(matches!(Engine::open(config), Err(BaronError::NotFound(_))));
}
