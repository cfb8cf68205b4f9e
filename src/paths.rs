//! Save directory discovery
//!
//! Where the game keeps its saves, relative to the user's home directory.

use std::path::PathBuf;

use crate::error::{BaronError, Result};

#[cfg(target_os = "windows")]
const SAVE_DIR: &[&str] = &["AppData", "LocalLow", "Owlcat Games", "Pathfinder Kingmaker", "Saved Games"];

#[cfg(target_os = "macos")]
const SAVE_DIR: &[&str] = &[
    "Library",
    "Application Support",
    "unity.Owlcat Games.Pathfinder Kingmaker",
    "Saved Games",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const SAVE_DIR: &[&str] = &[".config", "unity3d", "Owlcat Games", "Pathfinder Kingmaker", "Saved Games"];

/// The live save directory for the current user
pub fn default_save_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BaronError::Config("cannot determine the home directory".to_string()))?;
    Ok(save_dir_under(home))
}

/// The live save directory below `home`
pub fn save_dir_under(home: impl Into<PathBuf>) -> PathBuf {
    let mut path = home.into();
    path.extend(SAVE_DIR);
    path
}
