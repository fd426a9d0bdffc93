//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use dosprobe_harness::mocks::{MockClock, MockEmulator, MockFactory, MockFrame};
use dosprobe_harness::{Automation, Region, WatchImage};
use dosprobe_types::HarnessConfig;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 32;
pub const TITLE_COLOR: [u8; 4] = [0x55, 0xFF, 0xFF, 0xFF];

/// A facade on a mock clock, its emulator, and the temp dir holding the store.
pub struct Rig {
    pub automation: Automation,
    pub emulator: MockEmulator,
    pub factory: MockFactory,
    pub clock: MockClock,
    _tmp: TempDir,
}

/// Harness configuration with its store inside `tmp`.
pub fn test_config(tmp: &TempDir) -> HarnessConfig {
    HarnessConfig {
        store_path: tmp.path().join("fs.sqlite"),
        ..HarnessConfig::default()
    }
}

/// Build an un-booted rig.
pub fn rig() -> Rig {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let clock = MockClock::new();
    let emulator = MockEmulator::new(WIDTH, HEIGHT).with_clock(clock.clone());
    let factory = MockFactory::new(emulator.clone());
    let automation = Automation::with_clock(test_config(&tmp), Arc::new(clock.clone()));
    Rig {
        automation,
        emulator,
        factory,
        clock,
        _tmp: tmp,
    }
}

/// Build a rig and boot it without a bundle.
pub async fn booted_rig() -> Rig {
    let mut rig = rig();
    rig.automation
        .boot(&rig.factory, None)
        .await
        .expect("mock boot should succeed");
    rig
}

/// The frame a program shows once its title screen is up.
pub fn title_frame() -> MockFrame {
    let mut frame = MockFrame::new(WIDTH, HEIGHT);
    frame.fill_rect(8, 4, 16, 8, TITLE_COLOR);
    frame
}

pub fn title_region() -> Region {
    Region::new(8, 4, 16, 8).expect("non-empty region")
}

/// A watch image captured from [`title_frame`].
pub fn title_image() -> WatchImage {
    let source = MockEmulator::new(WIDTH, HEIGHT);
    source.set_frame(title_frame());
    WatchImage::capture(&source, title_region()).expect("capture should succeed")
}
