//! Error types shared across all dosprobe crates.

/// Errors raised outside the automation core itself.
///
/// Each variant corresponds to a supporting subsystem: the persistent file
/// store or configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("persistent store error: {0}")]
    StoreError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}
