//! A single persisted file.

use chrono::{DateTime, Utc};

/// Regular file, `rw-r--r--`.
pub const DEFAULT_FILE_MODE: u32 = 0o100_644;

/// One row of the persistent store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path inside the virtual filesystem.
    pub path: String,
    pub contents: Vec<u8>,
    pub mode: u32,
    /// Last time the file was synced.
    pub timestamp: DateTime<Utc>,
}

impl FileRecord {
    /// A regular file stamped with the current time.
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            mode: DEFAULT_FILE_MODE,
            timestamp: Utc::now(),
        }
    }
}
