//! The driver-facing facade.
//!
//! [`Automation`] owns at most one booted emulator and routes every call
//! through the component that handles it: strokes through the translator
//! and [`InputSequencer`], image checks through [`ImageWatcher`], files
//! through [`VirtualFileBridge`]. Every emulator-touching operation takes
//! `&mut self`, so input and polling never interleave on one instance.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use dosprobe_types::HarnessConfig;

use crate::clock::{Clock, TokioClock};
use crate::emulator::{EmulatorFactory, EmulatorSession};
use crate::error::HarnessError;
use crate::fs_bridge::VirtualFileBridge;
use crate::image::{self, WatchImage};
use crate::key;
use crate::sequencer::InputSequencer;
use crate::watch::{AbortSignal, ImageWatcher};

enum SessionState {
    Idle,
    Ready(EmulatorSession),
    Failed(String),
}

impl SessionState {
    fn session(&self) -> Result<&EmulatorSession, HarnessError> {
        match self {
            SessionState::Ready(session) => Ok(session),
            other => Err(other.not_ready()),
        }
    }

    fn session_mut(&mut self) -> Result<&mut EmulatorSession, HarnessError> {
        match self {
            SessionState::Ready(session) => Ok(session),
            other => Err(other.not_ready()),
        }
    }

    fn not_ready(&self) -> HarnessError {
        let reason = match self {
            SessionState::Idle => "emulator is not running".to_string(),
            SessionState::Ready(_) => "emulator is busy".to_string(),
            SessionState::Failed(reason) => format!("emulator failed to boot: {reason}"),
        };
        HarnessError::NotReady { reason }
    }
}

/// Drives one emulated DOS program: boot, type, watch, exchange files.
pub struct Automation {
    config: HarnessConfig,
    sequencer: InputSequencer,
    watcher: ImageWatcher,
    bridge: VirtualFileBridge,
    state: SessionState,
}

impl Automation {
    /// A facade using real tokio time.
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    pub fn with_clock(config: HarnessConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sequencer: InputSequencer::new(clock.clone(), config.settle_delay()),
            watcher: ImageWatcher::new(clock, config.poll_interval()),
            bridge: VirtualFileBridge::new(config.store_path.clone()),
            config,
            state: SessionState::Idle,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Why the last boot failed, while the facade is in the failed state.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Start the emulator and load the program bundle.
    ///
    /// A running instance is terminated first; if that fails, no new
    /// instance is started. On any failure the facade stays in a failed
    /// state and later operations report the reason.
    pub async fn boot(
        &mut self,
        factory: &dyn EmulatorFactory,
        bundle: Option<Vec<u8>>,
    ) -> Result<(), HarnessError> {
        let booted = match self.shutdown() {
            Ok(()) => match self.config.validate() {
                Ok(()) => EmulatorSession::boot(factory, &self.config.boot_config(bundle)).await,
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };
        match booted {
            Ok(session) => {
                self.state = SessionState::Ready(session);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "emulator boot failed");
                self.state = SessionState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Terminate the running instance, if any.
    pub fn shutdown(&mut self) -> Result<(), HarnessError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Ready(session) => session.terminate(),
            SessionState::Failed(_) | SessionState::Idle => Ok(()),
        }
    }

    /// Translate and type a sequence of stroke tokens.
    ///
    /// The whole sequence is validated before anything is dispatched.
    pub async fn send_strokes<S: AsRef<str>>(&mut self, strokes: &[S]) -> Result<(), HarnessError> {
        let codes = key::translate(strokes)?;
        let session = self.state.session_mut()?;
        self.sequencer.send(session.emulator_mut(), &codes).await
    }

    /// Block until `image` is on screen or `abort` is set.
    ///
    /// `interval` overrides the configured poll interval for this call.
    pub async fn watch_for_image(
        &mut self,
        image: &WatchImage,
        abort: Option<&AbortSignal>,
        interval: Option<Duration>,
    ) -> Result<(), HarnessError> {
        let session = self.state.session()?;
        self.watcher
            .watch(session.emulator(), image, abort, interval)
            .await
    }

    /// Check the current frame once.
    pub fn has_image(&self, image: &WatchImage) -> Result<bool, HarnessError> {
        image::matches(self.state.session()?.emulator(), image)
    }

    /// Place `contents` at `path` in the live filesystem, replacing any file.
    pub fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), HarnessError> {
        let session = self.state.session_mut()?;
        self.bridge
            .write(session.emulator_mut().filesystem(), path, contents)
    }

    /// Fetch `path` as it stands after a full filesystem sync.
    pub async fn get_file(&mut self, path: &str) -> Result<Vec<u8>, HarnessError> {
        let session = self.state.session_mut()?;
        self.bridge
            .read(session.emulator_mut().filesystem(), path)
            .await
    }
}
