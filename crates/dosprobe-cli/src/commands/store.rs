//! Persistent file store commands.
//!
//! `dosprobe store ls`            -- list stored paths
//! `dosprobe store get PATH`      -- dump a file
//! `dosprobe store put PATH FILE` -- add or replace a file
//! `dosprobe store rm PATH`       -- delete a file

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use dosprobe_store::{FileRecord, FileStore};
use dosprobe_types::ConfigLoader;

/// The explicit `--store` path, else the configured one.
fn resolve_store(store: Option<PathBuf>) -> Result<PathBuf> {
    match store {
        Some(path) => Ok(path),
        None => Ok(ConfigLoader::new()
            .load()
            .context("failed to load configuration")?
            .config
            .store_path),
    }
}

fn open_existing(path: &Path) -> Result<FileStore> {
    if !path.exists() {
        bail!("no store at {}", path.display());
    }
    FileStore::open(path).with_context(|| format!("failed to open store {}", path.display()))
}

/// Run `dosprobe store ls`.
pub fn ls(store: Option<PathBuf>) -> Result<()> {
    let path = resolve_store(store)?;
    let store = open_existing(&path)?;
    let paths = store.paths()?;
    if paths.is_empty() {
        println!("(empty store)");
        return Ok(());
    }
    for file in paths {
        if let Some(record) = store.get(&file)? {
            println!(
                "{:>8}  {:o}  {}  {}",
                record.contents.len(),
                record.mode,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.path
            );
        }
    }
    Ok(())
}

/// Run `dosprobe store get PATH`.
pub fn get(file: &str, store: Option<PathBuf>, out: Option<&Path>) -> Result<()> {
    let path = resolve_store(store)?;
    let contents = read_record(&path, file)?;
    match out {
        Some(out) => std::fs::write(out, &contents)
            .with_context(|| format!("failed to write {}", out.display()))?,
        None => std::io::stdout()
            .write_all(&contents)
            .context("failed to write to stdout")?,
    }
    Ok(())
}

/// Run `dosprobe store put PATH FILE`.
pub fn put(file: &str, local: &Path, store: Option<PathBuf>) -> Result<()> {
    let path = resolve_store(store)?;
    let contents =
        std::fs::read(local).with_context(|| format!("failed to read {}", local.display()))?;
    let bytes = contents.len();
    write_record(&path, file, contents)?;
    println!("stored {file} ({bytes} bytes)");
    Ok(())
}

/// Run `dosprobe store rm PATH`.
pub fn rm(file: &str, store: Option<PathBuf>) -> Result<()> {
    let path = resolve_store(store)?;
    let store = open_existing(&path)?;
    if !store.delete(file)? {
        bail!("{file} is not in the store");
    }
    println!("removed {file}");
    Ok(())
}

fn read_record(store_path: &Path, file: &str) -> Result<Vec<u8>> {
    let store = open_existing(store_path)?;
    match store.get(file)? {
        Some(record) => Ok(record.contents),
        None => bail!("{file} is not in the store"),
    }
}

fn write_record(store_path: &Path, file: &str, contents: Vec<u8>) -> Result<()> {
    if !file.starts_with('/') {
        bail!("store paths are absolute, got {file:?}");
    }
    let store = FileStore::open(store_path)
        .with_context(|| format!("failed to open store {}", store_path.display()))?;
    store.put(&FileRecord::new(file, contents))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("fs.sqlite");
        write_record(&store, "/game/SAVE.DAT", vec![4, 5, 6]).unwrap();
        assert_eq!(read_record(&store, "/game/SAVE.DAT").unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn relative_path_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("fs.sqlite");
        assert!(write_record(&store, "SAVE.DAT", vec![1]).is_err());
        assert!(!store.exists());
    }

    #[test]
    fn missing_store_is_not_created_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("absent.sqlite");
        assert!(read_record(&store, "/x").is_err());
        assert!(!store.exists());
    }

    #[test]
    fn rm_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("fs.sqlite");
        write_record(&store, "/a", vec![1]).unwrap();
        rm("/a", Some(store.clone())).unwrap();
        assert!(rm("/a", Some(store)).is_err());
    }
}
