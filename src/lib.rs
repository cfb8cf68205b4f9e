//! # Baron Builder
//!
//! Save-file tooling for Pathfinder: Kingmaker with:
//! - Codec-preserving unpack/repack of zip save containers
//! - Backup and archive stores, each with its own manifest
//! - Journaled transfers between the live directory and the stores
//! - Consistency checks between every directory and its manifest
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI / Caller                            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Operation
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        (Unpack / Repack / Backup / Archive / Restore)        │
//! └──────┬───────────────────┬───────────────────────┬──────────┘
//!        │                   │                       │
//!        ▼                   ▼                       ▼
//! ┌─────────────┐    ┌───────────────┐       ┌─────────────┐
//! │  Container  │    │   Manifests   │       │   Journal   │
//! │ (zip codec) │    │ live/bak/arch │       │ (transfers) │
//! └─────────────┘    └───────────────┘       └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod container;
pub mod engine;
pub mod journal;
pub mod manifest;
pub mod paths;
pub mod storage;
pub mod transfer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::{ConsistencyReport, Engine};
pub use error::{BaronError, Result};
pub use transfer::{Operation, Outcome, RestoreSource};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Baron Builder
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
