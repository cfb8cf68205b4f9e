//! Manifest Module
//!
//! One JSON ledger per storage location listing which save files exist
//! there and at which version.
//!
//! ## Responsibilities
//! - Parse and validate the ledger (`ManifestCorrupt` on schema violations)
//! - Idempotent bootstrap of empty ledgers
//! - Extension-insensitive lookup, removal and monotonic merge
//! - Bijection check between a directory and its ledger
//!
//! ## File Format
//! ```text
//! {
//!   "Version": 3,
//!   "Files": [
//!     { "Filename": "hero.zks", "Version": 3 },
//!     { "Filename": "quick.zks", "Version": 1 }
//!   ]
//! }
//! ```

mod entry;
mod store;

pub use entry::{stem_of, Manifest, ManifestEntry};
pub use store::{
    extract_entry, load_manifest, merge_entries, remove_entry, save_manifest, start_manifest_at,
    verify, ManifestStore, VerifyReport,
};
