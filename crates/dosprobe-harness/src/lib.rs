//! Automation harness for DOS programs running in an emulator.
//!
//! A test driver boots an emulated program, types into it, waits for
//! visual milestones, and exchanges files with its virtual disk, all
//! through one facade.
//!
//! # Overview
//!
//! - [`Automation`]: the facade a driver talks to
//! - [`key`]: stroke tokens (`":ABC"`, `"enter"`) to key codes
//! - [`InputSequencer`]: press/release pairs with a settle delay
//! - [`WatchImage`] and [`ImageWatcher`]: region snapshots and polling
//! - [`VirtualFileBridge`]: writes into the live filesystem, reads back
//!   through the persistent store
//! - [`Emulator`], [`VirtualFs`], [`EmulatorFactory`]: the runtime seam
//! - [`mocks`]: deterministic doubles for all of the above
//!
//! # Example
//!
//! ```no_run
//! use dosprobe_harness::{abort_after, Automation, EmulatorFactory, WatchImage};
//! use dosprobe_types::HarnessConfig;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn run(factory: &dyn EmulatorFactory) -> Result<(), dosprobe_harness::HarnessError> {
//! let mut automation = Automation::new(HarnessConfig::default());
//! automation.boot(factory, None).await?;
//!
//! let title = WatchImage::load(Path::new("fixtures/title.json"))?;
//! let deadline = abort_after(Duration::from_secs(30));
//! automation.watch_for_image(&title, Some(&deadline), None).await?;
//!
//! automation.send_strokes(&[":NEWGAME", "enter"]).await?;
//! let save = automation.get_file("/game/SAVE.DAT").await?;
//! # let _ = save;
//! # Ok(())
//! # }
//! ```

pub mod automation;
pub mod clock;
pub mod emulator;
pub mod error;
pub mod fs_bridge;
pub mod image;
pub mod key;
pub mod mocks;
pub mod sequencer;
pub mod watch;

pub use automation::Automation;
pub use clock::{Clock, TokioClock};
pub use emulator::{Emulator, EmulatorFactory, EmulatorSession, VirtualFs};
pub use error::HarnessError;
pub use fs_bridge::VirtualFileBridge;
pub use image::{Region, WatchImage};
pub use key::{translate, KeyCode, NamedKey, Stroke};
pub use sequencer::InputSequencer;
pub use watch::{abort_after, abort_signal, AbortSignal, ImageWatcher};
