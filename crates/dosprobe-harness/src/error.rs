//! Error types for the harness crate.

use dosprobe_types::ProbeError;

/// Errors surfaced to a test driver.
///
/// Nothing in the harness retries: every variant is terminal for the
/// operation that produced it.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A stroke token was malformed or named an unknown key.
    #[error("invalid stroke {token:?}: {reason}")]
    InvalidStroke {
        /// The token as the driver supplied it.
        token: String,
        /// The offending character inside a literal directive, if any.
        character: Option<char>,
        reason: String,
    },
    /// The emulator has not booted, failed to boot, or was terminated.
    #[error("emulator not ready: {reason}")]
    NotReady { reason: String },
    /// Virtual file paths must be absolute; the store is keyed by them.
    #[error("virtual path must be absolute: {path:?}")]
    InvalidPath { path: String },
    /// No synced record exists for the path.
    #[error("file not found in persistent store: {path}")]
    FileNotFound { path: String },
    /// A watch region or pixel buffer has an unusable shape.
    #[error("invalid region: {0}")]
    InvalidRegion(String),
    /// Encoding or decoding a region snapshot failed.
    #[error("image encoding error: {0}")]
    Encoding(String),
    /// The emulator runtime reported a failure.
    #[error("emulator error: {0}")]
    Emulator(String),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fixture format error: {0}")]
    Json(#[from] serde_json::Error),
}
