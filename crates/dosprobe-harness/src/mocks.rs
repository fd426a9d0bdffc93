//! Deterministic test doubles for the emulator runtime.
//!
//! Provides:
//! - [`MockClock`]: records sleeps and advances virtual time without waiting
//! - [`MockEmulator`]: in-memory frame, key event log, and filesystem
//! - [`MockFilesystem`]: live file map that syncs into a real [`FileStore`]
//! - [`MockFactory`]: hands out a shared [`MockEmulator`] and records boots
//!
//! All doubles keep their state behind `Arc<Mutex<_>>`, so a test can keep
//! a clone for inspection after handing the original to the harness.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dosprobe_store::{FileRecord, FileStore};
use dosprobe_types::BootConfig;

use crate::clock::Clock;
use crate::emulator::{Emulator, EmulatorFactory, VirtualFs};
use crate::error::HarnessError;
use crate::image::Region;
use crate::key::KeyCode;

// ---------------------------------------------------------------------------
// MockClock
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockClockInner {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// A clock that never waits.
///
/// Each sleep is recorded, advances the virtual elapsed time, and yields to
/// the runtime once so other tasks still get scheduled.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    inner: Arc<Mutex<MockClockInner>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time slept so far.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().expect("mock clock lock poisoned").elapsed
    }

    /// Every sleep requested, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .expect("mock clock lock poisoned")
            .sleeps
            .clone()
    }
}

#[async_trait]
impl Clock for MockClock {
    async fn sleep(&self, duration: Duration) {
        {
            let mut inner = self.inner.lock().expect("mock clock lock poisoned");
            inner.elapsed += duration;
            inner.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// MockFrame
// ---------------------------------------------------------------------------

/// An RGBA framebuffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl MockFrame {
    /// An opaque black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0xFF])
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Paint a rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) {
        for row in y..y.saturating_add(h).min(self.height) {
            for col in x..x.saturating_add(w).min(self.width) {
                let i = self.offset(col, row);
                self.pixels[i..i + 4].copy_from_slice(&color);
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[i..i + 4]);
        Some(px)
    }

    /// Copy out a region; outside pixels are transparent black.
    fn read(&self, region: &Region) -> Vec<u8> {
        let mut out = Vec::with_capacity(region.rgba_len());
        for dy in 0..region.sh {
            for dx in 0..region.sw {
                let x = i64::from(region.sx) + i64::from(dx);
                let y = i64::from(region.sy) + i64::from(dy);
                let px = u32::try_from(x)
                    .ok()
                    .zip(u32::try_from(y).ok())
                    .and_then(|(x, y)| self.pixel(x, y))
                    .unwrap_or([0; 4]);
                out.extend_from_slice(&px);
            }
        }
        out
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

// ---------------------------------------------------------------------------
// MockFilesystem
// ---------------------------------------------------------------------------

/// A mutating operation performed on the live filesystem by the harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Unlink(String),
    Create(String),
}

#[derive(Debug)]
struct MockFsInner {
    files: BTreeMap<String, Vec<u8>>,
    cwd: String,
    store_path: Option<PathBuf>,
    operations: Vec<FsOp>,
    extracted: Vec<(usize, String)>,
    syncs: usize,
    extract_failure: Option<String>,
}

/// Live in-memory filesystem.
///
/// Like the real one it refuses to create over an existing file, and
/// [`force_sync`](VirtualFs::force_sync) mirrors every file into the
/// SQLite [`FileStore`] at the configured store path.
#[derive(Debug, Clone)]
pub struct MockFilesystem {
    inner: Arc<Mutex<MockFsInner>>,
}

impl Default for MockFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockFsInner {
                files: BTreeMap::new(),
                cwd: "/".to_string(),
                store_path: None,
                operations: Vec::new(),
                extracted: Vec::new(),
                syncs: 0,
                extract_failure: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockFsInner> {
        self.inner.lock().expect("mock filesystem lock poisoned")
    }

    /// Where `force_sync` writes.
    pub fn set_store_path(&self, path: &Path) {
        self.lock().store_path = Some(path.to_path_buf());
    }

    /// Make the next `extract` calls fail.
    pub fn fail_extract(&self, reason: impl Into<String>) {
        self.lock().extract_failure = Some(reason.into());
    }

    /// A write made by the emulated program rather than the harness.
    pub fn guest_write(&self, path: &str, contents: Vec<u8>) {
        let mut inner = self.lock();
        let path = resolve(&inner.cwd, path);
        inner.files.insert(path, contents);
    }

    /// A delete made by the emulated program.
    pub fn guest_delete(&self, path: &str) {
        let mut inner = self.lock();
        let path = resolve(&inner.cwd, path);
        inner.files.remove(&path);
    }

    /// Contents of a live file.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let inner = self.lock();
        inner.files.get(&resolve(&inner.cwd, path)).cloned()
    }

    pub fn cwd(&self) -> String {
        self.lock().cwd.clone()
    }

    /// Harness-issued unlink/create calls, in order.
    pub fn operations(&self) -> Vec<FsOp> {
        self.lock().operations.clone()
    }

    /// `(archive length, mount path)` of every extraction.
    pub fn extractions(&self) -> Vec<(usize, String)> {
        self.lock().extracted.clone()
    }

    pub fn sync_count(&self) -> usize {
        self.lock().syncs
    }
}

#[async_trait]
impl VirtualFs for MockFilesystem {
    async fn extract(&mut self, archive: &[u8], mount_path: &str) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.extract_failure {
            return Err(HarnessError::Emulator(format!("extract failed: {reason}")));
        }
        inner.extracted.push((archive.len(), mount_path.to_string()));
        Ok(())
    }

    fn change_directory(&mut self, path: &str) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        inner.cwd = resolve(&inner.cwd, path);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        let inner = self.lock();
        inner.files.contains_key(&resolve(&inner.cwd, path))
    }

    fn unlink(&mut self, path: &str) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        let path = resolve(&inner.cwd, path);
        if inner.files.remove(&path).is_none() {
            return Err(HarnessError::Emulator(format!("unlink {path}: no such file")));
        }
        inner.operations.push(FsOp::Unlink(path));
        Ok(())
    }

    fn create_file(&mut self, path: &str, contents: &[u8]) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        let path = resolve(&inner.cwd, path);
        if inner.files.contains_key(&path) {
            return Err(HarnessError::Emulator(format!("create {path}: file exists")));
        }
        inner.files.insert(path.clone(), contents.to_vec());
        inner.operations.push(FsOp::Create(path));
        Ok(())
    }

    async fn force_sync(&mut self) -> Result<(), HarnessError> {
        let (store_path, records) = {
            let mut inner = self.lock();
            inner.syncs += 1;
            let store_path = inner.store_path.clone().ok_or_else(|| {
                HarnessError::Emulator("filesystem has no persistent store".to_string())
            })?;
            let records: Vec<FileRecord> = inner
                .files
                .iter()
                .map(|(path, contents)| FileRecord::new(path.clone(), contents.clone()))
                .collect();
            (store_path, records)
        };

        let mut store = FileStore::open(&store_path)?;
        store.replace_all(&records)?;
        Ok(())
    }
}

/// Resolve `path` against `cwd`.
fn resolve(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else if cwd.ends_with('/') {
        format!("{cwd}{path}")
    } else {
        format!("{cwd}/{path}")
    }
}

// ---------------------------------------------------------------------------
// MockEmulator
// ---------------------------------------------------------------------------

/// One injected key event, stamped with the mock clock's virtual time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub pressed: bool,
    pub at: Duration,
}

#[derive(Debug)]
struct MockEmulatorInner {
    frame: MockFrame,
    /// Frame swapped in once more than `.0` reads have happened.
    pending_frame: Option<(usize, MockFrame)>,
    frame_reads: usize,
    events: Vec<KeyEvent>,
    input_ready: bool,
    terminate_calls: usize,
    terminate_failure: Option<String>,
    /// Key events accepted before injection starts failing.
    input_budget: Option<usize>,
}

/// An in-memory emulator.
#[derive(Debug, Clone)]
pub struct MockEmulator {
    inner: Arc<Mutex<MockEmulatorInner>>,
    fs: MockFilesystem,
    clock: Option<MockClock>,
}

impl MockEmulator {
    /// An emulator showing an opaque black frame of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockEmulatorInner {
                frame: MockFrame::new(width, height),
                pending_frame: None,
                frame_reads: 0,
                events: Vec::new(),
                input_ready: true,
                terminate_calls: 0,
                terminate_failure: None,
                input_budget: None,
            })),
            fs: MockFilesystem::new(),
            clock: None,
        }
    }

    /// Stamp key events with `clock`'s virtual time.
    #[must_use]
    pub fn with_clock(mut self, clock: MockClock) -> Self {
        self.clock = Some(clock);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockEmulatorInner> {
        self.inner.lock().expect("mock emulator lock poisoned")
    }

    pub fn set_frame(&self, frame: MockFrame) {
        let mut inner = self.lock();
        inner.frame = frame;
        inner.pending_frame = None;
    }

    /// Show `frame` starting with read number `reads + 1`.
    pub fn set_frame_after_reads(&self, reads: usize, frame: MockFrame) {
        let mut inner = self.lock();
        let at = inner.frame_reads + reads;
        inner.pending_frame = Some((at, frame));
    }

    pub fn set_input_ready(&self, ready: bool) {
        self.lock().input_ready = ready;
    }

    /// Accept `events` more key events, then fail injection.
    pub fn fail_input_after(&self, events: usize) {
        let mut inner = self.lock();
        inner.input_budget = Some(inner.events.len() + events);
    }

    /// Make `terminate` fail. Calls are still counted.
    pub fn fail_terminate(&self, reason: impl Into<String>) {
        self.lock().terminate_failure = Some(reason.into());
    }

    /// Number of `read_pixels` calls so far.
    pub fn frame_reads(&self) -> usize {
        self.lock().frame_reads
    }

    pub fn key_events(&self) -> Vec<KeyEvent> {
        self.lock().events.clone()
    }

    pub fn terminate_calls(&self) -> usize {
        self.lock().terminate_calls
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate_calls() > 0
    }

    /// Shared handle to the live filesystem.
    pub fn fs(&self) -> MockFilesystem {
        self.fs.clone()
    }
}

impl Emulator for MockEmulator {
    fn inject_key_event(&mut self, code: KeyCode, pressed: bool) -> Result<(), HarnessError> {
        let at = self.clock.as_ref().map(MockClock::elapsed).unwrap_or_default();
        let mut inner = self.lock();
        if inner.terminate_calls > 0 {
            return Err(HarnessError::NotReady {
                reason: "emulator was terminated".to_string(),
            });
        }
        if !inner.input_ready {
            return Err(HarnessError::NotReady {
                reason: "input surface not initialized".to_string(),
            });
        }
        if inner.input_budget.is_some_and(|budget| inner.events.len() >= budget) {
            return Err(HarnessError::Emulator("key event rejected".to_string()));
        }
        inner.events.push(KeyEvent { code, pressed, at });
        Ok(())
    }

    fn frame_size(&self) -> (u32, u32) {
        self.lock().frame.size()
    }

    fn read_pixels(&self, region: &Region) -> Result<Vec<u8>, HarnessError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.terminate_calls > 0 {
            return Err(HarnessError::NotReady {
                reason: "emulator was terminated".to_string(),
            });
        }
        inner.frame_reads += 1;
        if inner
            .pending_frame
            .as_ref()
            .is_some_and(|(at, _)| inner.frame_reads > *at)
        {
            if let Some((_, frame)) = inner.pending_frame.take() {
                inner.frame = frame;
            }
        }
        Ok(inner.frame.read(region))
    }

    fn filesystem(&mut self) -> &mut dyn VirtualFs {
        &mut self.fs
    }

    fn terminate(&mut self) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        inner.terminate_calls += 1;
        match &inner.terminate_failure {
            Some(reason) => Err(HarnessError::Emulator(format!("terminate failed: {reason}"))),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockFactory
// ---------------------------------------------------------------------------

/// Hands out clones of one [`MockEmulator`].
#[derive(Debug, Clone)]
pub struct MockFactory {
    emulator: MockEmulator,
    start_failure: Option<String>,
    boots: Arc<Mutex<Vec<BootConfig>>>,
}

impl MockFactory {
    pub fn new(emulator: MockEmulator) -> Self {
        Self {
            emulator,
            start_failure: None,
            boots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A factory whose `start` always fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            start_failure: Some(reason.into()),
            ..Self::new(MockEmulator::new(1, 1))
        }
    }

    /// Every boot configuration passed to `start`.
    pub fn boots(&self) -> Vec<BootConfig> {
        self.boots.lock().expect("mock factory lock poisoned").clone()
    }
}

#[async_trait]
impl EmulatorFactory for MockFactory {
    async fn start(&self, config: &BootConfig) -> Result<Box<dyn Emulator>, HarnessError> {
        self.boots
            .lock()
            .expect("mock factory lock poisoned")
            .push(config.clone());
        if let Some(reason) = &self.start_failure {
            return Err(HarnessError::Emulator(format!("start failed: {reason}")));
        }
        self.emulator.fs.set_store_path(&config.store_path);
        Ok(Box::new(self.emulator.clone()))
    }
}
