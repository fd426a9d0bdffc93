//! Moving file data in and out of the emulator.
//!
//! Writes go straight into the live virtual filesystem, where the emulated
//! program sees them immediately. Reads go through the persistent store
//! after a forced sync, because only the store is guaranteed to reflect
//! files the emulated program wrote itself.

use std::path::{Path, PathBuf};

use tracing::debug;

use dosprobe_store::FileStore;

use crate::emulator::VirtualFs;
use crate::error::HarnessError;

/// Read/write access to one emulator's files.
#[derive(Debug, Clone)]
pub struct VirtualFileBridge {
    store_path: PathBuf,
}

impl VirtualFileBridge {
    /// A bridge reading back through the store at `store_path`.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Replace the file at `path` with `contents`.
    ///
    /// The filesystem cannot overwrite in place, so an existing file is
    /// unlinked before the new one is created.
    pub fn write(
        &self,
        fs: &mut dyn VirtualFs,
        path: &str,
        contents: &[u8],
    ) -> Result<(), HarnessError> {
        require_absolute(path)?;
        let replaced = fs.exists(path);
        if replaced {
            fs.unlink(path)?;
        }
        fs.create_file(path, contents)?;
        debug!(path, bytes = contents.len(), replaced, "wrote virtual file");
        Ok(())
    }

    /// Sync the live filesystem and fetch `path` from the persistent store.
    pub async fn read(&self, fs: &mut dyn VirtualFs, path: &str) -> Result<Vec<u8>, HarnessError> {
        require_absolute(path)?;
        fs.force_sync().await?;

        let store = FileStore::open(&self.store_path)?;
        let record = store.get(path)?.ok_or_else(|| HarnessError::FileNotFound {
            path: path.to_string(),
        })?;
        debug!(path, bytes = record.contents.len(), "read synced file");
        Ok(record.contents)
    }
}

/// The live filesystem resolves relative paths against its cwd but the
/// store does not, so only absolute paths round-trip.
fn require_absolute(path: &str) -> Result<(), HarnessError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(HarnessError::InvalidPath {
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FsOp, MockFilesystem};

    fn bridge_with_fs() -> (tempfile::TempDir, VirtualFileBridge, MockFilesystem) {
        let tmp = tempfile::tempdir().unwrap();
        let store_path = tmp.path().join("fs.sqlite");
        let fs = MockFilesystem::new();
        fs.set_store_path(&store_path);
        (tmp, VirtualFileBridge::new(store_path), fs)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (_tmp, bridge, mut fs) = bridge_with_fs();
        bridge.write(&mut fs, "/game/save.dat", &[1, 2, 3]).unwrap();
        assert_eq!(bridge.read(&mut fs, "/game/save.dat").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn overwrite_deletes_then_creates() {
        let (_tmp, bridge, mut fs) = bridge_with_fs();
        bridge.write(&mut fs, "/game/cfg", b"old").unwrap();
        bridge.write(&mut fs, "/game/cfg", b"newer").unwrap();

        assert_eq!(
            fs.operations(),
            vec![
                FsOp::Create("/game/cfg".into()),
                FsOp::Unlink("/game/cfg".into()),
                FsOp::Create("/game/cfg".into()),
            ]
        );
        assert_eq!(bridge.read(&mut fs, "/game/cfg").await.unwrap(), b"newer");
    }

    #[tokio::test]
    async fn read_forces_a_sync_first() {
        let (_tmp, bridge, mut fs) = bridge_with_fs();
        fs.guest_write("/game/HISCORE.DAT", vec![9, 9]);
        assert_eq!(fs.sync_count(), 0);

        assert_eq!(bridge.read(&mut fs, "/game/HISCORE.DAT").await.unwrap(), vec![9, 9]);
        assert_eq!(fs.sync_count(), 1);
    }

    #[tokio::test]
    async fn missing_path_is_file_not_found() {
        let (_tmp, bridge, mut fs) = bridge_with_fs();
        let err = bridge.read(&mut fs, "/missing").await.unwrap_err();
        assert!(matches!(err, HarnessError::FileNotFound { ref path } if path == "/missing"));
    }

    #[tokio::test]
    async fn deleted_file_disappears_after_sync() {
        let (_tmp, bridge, mut fs) = bridge_with_fs();
        bridge.write(&mut fs, "/game/tmp", &[1]).unwrap();
        bridge.read(&mut fs, "/game/tmp").await.unwrap();

        fs.guest_delete("/game/tmp");
        assert!(matches!(
            bridge.read(&mut fs, "/game/tmp").await,
            Err(HarnessError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn relative_paths_are_rejected_before_touching_fs() {
        let (_tmp, bridge, mut fs) = bridge_with_fs();
        fs.change_directory("/game").unwrap();

        let err = bridge.write(&mut fs, "SAVE.DAT", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidPath { ref path } if path == "SAVE.DAT"));
        assert!(fs.operations().is_empty());

        let err = bridge.read(&mut fs, "SAVE.DAT").await.unwrap_err();
        assert!(matches!(err, HarnessError::InvalidPath { .. }));
        assert_eq!(fs.sync_count(), 0);
    }
}
