//! Tests for unpacking save containers
//!
//! These tests verify:
//! - Codec table capture in container order
//! - Working directory creation and reuse
//! - Argument validation
//! - Unknown methods are rejected before extraction; LZMA members decode

use std::fs;

use baron_builder::container::{unpack, Codec, CodecTable, SaveContainer};
use baron_builder::BaronError;
use tempfile::TempDir;
use zip::CompressionMethod;

use super::{set_member_method, setup_lzma_save, setup_save, standard_members, write_container};

#[test]
fn test_unpack_records_every_codec() {
    let (temp, save) = setup_save();
    let scratch = temp.path().join("Working");

    let unpacked = unpack(&save, &scratch).unwrap();

    assert_eq!(unpacked.working_dir, scratch.join("hero"));
    assert!(unpacked.created);
    assert_eq!(unpacked.codecs.get("header.json"), Some(Codec::Deflated));
    assert_eq!(unpacked.codecs.get("party.json"), Some(Codec::Stored));
    assert_eq!(unpacked.codecs.get("player.json"), Some(Codec::Bzip2));
    assert_eq!(unpacked.codecs.get("area/history.dat"), Some(Codec::Stored));

    let order: Vec<&str> = unpacked.codecs.members().map(|(name, _)| name).collect();
    let expected: Vec<&str> = standard_members().iter().map(|(name, _, _)| *name).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_unpack_extracts_member_bytes() {
    let (temp, save) = setup_save();
    let unpacked = unpack(&save, temp.path()).unwrap();

    for (name, bytes, _) in standard_members() {
        assert_eq!(fs::read(unpacked.working_dir.join(name)).unwrap(), bytes);
    }
}

#[test]
fn test_unpack_reuses_existing_working_dir() {
    let (temp, save) = setup_save();
    fs::create_dir_all(temp.path().join("hero")).unwrap();

    let unpacked = unpack(&save, temp.path()).unwrap();

    assert!(!unpacked.created);
    assert!(unpacked.working_dir.join("header.json").is_file());
    // A second unpack over the first is also fine
    assert!(unpack(&save, temp.path()).is_ok());
}

#[test]
fn test_capture_matches_unpack() {
    let (temp, save) = setup_save();
    let unpacked = unpack(&save, temp.path()).unwrap();

    assert_eq!(CodecTable::capture(&save).unwrap(), unpacked.codecs);
}

#[test]
fn test_unpack_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = unpack(&temp.path().join("nope.zks"), temp.path());
    assert!(matches!(result, Err(BaronError::NotFound(_))));
}

#[test]
fn test_unpack_directory_is_validation_error() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("dir.zks");
    fs::create_dir(&dir).unwrap();

    let result = unpack(&dir, temp.path());
    assert!(matches!(result, Err(BaronError::Validation(_))));
}

#[test]
fn test_unpack_not_a_zip_marks_container_failed() {
    let temp = TempDir::new().unwrap();
    let save = temp.path().join("broken.zks");
    fs::write(&save, b"definitely not a zip").unwrap();

    let mut container = SaveContainer::open(&save).unwrap();
    assert!(container.unpack(temp.path()).is_err());
    assert!(container.is_failed());
    assert!(container.codecs().is_none());
    assert!(container.unpack(temp.path()).is_err());
}

#[test]
fn test_open_empty_path() {
    let result = SaveContainer::open("");
    assert!(matches!(result, Err(BaronError::Validation(_))));
}

#[test]
fn test_unknown_method_is_codec_unknown() {
    let temp = TempDir::new().unwrap();
    let save = temp.path().join("hero.zks");
    write_container(
        &save,
        &[
            ("header.json", br#"{"Name":"Hero"}"#.to_vec(), CompressionMethod::Stored),
            ("party.json", br#"{"Gold":1}"#.to_vec(), CompressionMethod::Stored),
        ],
    );
    // 93 is zstd, which is not on the allow-list
    set_member_method(&save, "party.json", 93);

    let result = unpack(&save, &temp.path().join("Working"));

    match result {
        Err(BaronError::CodecUnknown { member, .. }) => assert_eq!(member, "party.json"),
        other => panic!("expected CodecUnknown, got {:?}", other),
    }
    assert!(!temp.path().join("Working").join("hero").exists());
    assert!(matches!(
        CodecTable::capture(&save),
        Err(BaronError::CodecUnknown { .. })
    ));
}

#[test]
fn test_unpack_lzma_member() {
    let (temp, save) = setup_lzma_save();

    let unpacked = unpack(&save, temp.path()).unwrap();

    assert_eq!(unpacked.codecs.get("header.json"), Some(Codec::Lzma));
    assert_eq!(unpacked.codecs.get("party.json"), Some(Codec::Deflated));
    assert_eq!(unpacked.codecs.get("player.json"), Some(Codec::Stored));
    assert_eq!(
        fs::read(unpacked.working_dir.join("header.json")).unwrap(),
        br#"{"Name":"Hero"}"#
    );
}
