//! Persistent backing store for the emulator's virtual filesystem.
//!
//! The emulator synchronizes its live in-memory filesystem into a
//! [`FileStore`]; the harness opens the same store to read back files the
//! emulated program wrote. The schema is a single versioned key-value table
//! keyed by file path.

pub mod record;
pub mod store;

pub use record::FileRecord;
pub use store::{FileStore, STORE_VERSION};
