//! The emulator runtime as the harness sees it.
//!
//! The runtime is external and opaque. The harness consumes it through the
//! [`Emulator`] and [`VirtualFs`] traits, obtains instances from an injected
//! [`EmulatorFactory`], and owns each instance through an
//! [`EmulatorSession`] that terminates it on every exit path.

use async_trait::async_trait;
use tracing::{info, warn};

use dosprobe_types::BootConfig;

use crate::error::HarnessError;
use crate::image::Region;
use crate::key::KeyCode;

/// A running emulator instance.
pub trait Emulator: Send + Sync {
    /// Inject one half of a key press.
    ///
    /// Fails with [`HarnessError::NotReady`] while the input surface is not
    /// initialized.
    fn inject_key_event(&mut self, code: KeyCode, pressed: bool) -> Result<(), HarnessError>;

    /// Width and height of the rendered frame.
    fn frame_size(&self) -> (u32, u32);

    /// Read `region` of the current frame as row-major 8-bit RGBA.
    ///
    /// Pixels outside the frame read as transparent black, so the result
    /// is always `region.rgba_len()` bytes.
    fn read_pixels(&self, region: &Region) -> Result<Vec<u8>, HarnessError>;

    /// The live virtual filesystem.
    fn filesystem(&mut self) -> &mut dyn VirtualFs;

    /// Release the instance. Later calls on it may fail.
    fn terminate(&mut self) -> Result<(), HarnessError>;
}

/// The emulator's live in-memory filesystem.
///
/// Files written here become durable only after [`VirtualFs::force_sync`]
/// copies the whole filesystem into the persistent store.
#[async_trait]
pub trait VirtualFs: Send {
    /// Unpack a program archive under `mount_path`.
    async fn extract(&mut self, archive: &[u8], mount_path: &str) -> Result<(), HarnessError>;

    fn change_directory(&mut self, path: &str) -> Result<(), HarnessError>;

    fn exists(&self, path: &str) -> bool;

    fn unlink(&mut self, path: &str) -> Result<(), HarnessError>;

    /// Create a new file. Fails if `path` already exists.
    fn create_file(&mut self, path: &str, contents: &[u8]) -> Result<(), HarnessError>;

    /// Synchronize the live filesystem to its persistent store.
    async fn force_sync(&mut self) -> Result<(), HarnessError>;
}

/// Starts emulator instances.
#[async_trait]
pub trait EmulatorFactory: Send + Sync {
    async fn start(&self, config: &BootConfig) -> Result<Box<dyn Emulator>, HarnessError>;
}

/// Exclusive owner of one booted emulator instance.
///
/// Dropping the session terminates the instance if [`terminate`](Self::terminate)
/// was not called.
pub struct EmulatorSession {
    emulator: Box<dyn Emulator>,
    terminated: bool,
}

impl EmulatorSession {
    /// Start an instance, extract the program bundle, and enter the working
    /// directory.
    ///
    /// If any step after start fails, the instance is terminated before the
    /// error is returned.
    pub async fn boot(
        factory: &dyn EmulatorFactory,
        config: &BootConfig,
    ) -> Result<Self, HarnessError> {
        let emulator = factory.start(config).await?;
        let mut session = Self {
            emulator,
            terminated: false,
        };

        if let Some(bundle) = &config.bundle {
            session
                .emulator
                .filesystem()
                .extract(bundle, &config.mount_path)
                .await?;
        }
        session
            .emulator
            .filesystem()
            .change_directory(&config.working_dir)?;

        let (width, height) = session.emulator.frame_size();
        info!(
            module = %config.module_url,
            mount = %config.mount_path,
            cwd = %config.working_dir,
            width,
            height,
            "emulator booted"
        );
        Ok(session)
    }

    pub fn emulator(&self) -> &dyn Emulator {
        self.emulator.as_ref()
    }

    pub fn emulator_mut(&mut self) -> &mut dyn Emulator {
        self.emulator.as_mut()
    }

    /// Terminate the instance and report any failure.
    pub fn terminate(mut self) -> Result<(), HarnessError> {
        self.terminated = true;
        let result = self.emulator.terminate();
        info!(ok = result.is_ok(), "emulator terminated");
        result
    }
}

impl Drop for EmulatorSession {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        match self.emulator.terminate() {
            Ok(()) => info!("emulator terminated on drop"),
            Err(e) => warn!(error = %e, "failed to terminate emulator on drop"),
        }
    }
}
