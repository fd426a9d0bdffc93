//! End-to-end scenarios against the mock emulator.

mod common;

use std::sync::Arc;
use std::time::Duration;

use dosprobe_harness::mocks::{MockEmulator, MockFactory};
use dosprobe_harness::{abort_after, abort_signal, Automation, HarnessError, TokioClock};

use common::*;

fn codes_and_edges(emulator: &MockEmulator) -> Vec<(u16, bool)> {
    emulator
        .key_events()
        .iter()
        .map(|e| (e.code.value(), e.pressed))
        .collect()
}

// ---------------------------------------------------------------------------
// Boot lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn boot_extracts_bundle_and_enters_mount_path() {
    let mut rig = rig();
    rig.automation
        .boot(&rig.factory, Some(vec![0x50, 0x4B, 3, 4]))
        .await
        .unwrap();

    assert!(rig.automation.is_ready());
    let fs = rig.emulator.fs();
    assert_eq!(fs.extractions(), vec![(4, "/game".to_string())]);
    assert_eq!(fs.cwd(), "/game");

    let boots = rig.factory.boots();
    assert_eq!(boots.len(), 1);
    assert_eq!(boots[0].working_dir, "/game");
    assert_eq!(boots[0].key_target, "canvas");
}

#[tokio::test]
async fn failed_boot_terminates_and_reports_reason() {
    let mut rig = rig();
    rig.emulator.fs().fail_extract("corrupt archive");

    let err = rig
        .automation
        .boot(&rig.factory, Some(vec![1, 2, 3]))
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Emulator(_)));
    assert!(rig.emulator.is_terminated());
    assert!(!rig.automation.is_ready());

    match rig.automation.send_strokes(&["enter"]).await {
        Err(HarnessError::NotReady { reason }) => assert!(reason.contains("corrupt archive")),
        other => panic!("expected NotReady, got {other:?}"),
    }
    assert!(rig.emulator.key_events().is_empty());
}

#[tokio::test]
async fn factory_failure_leaves_failed_state() {
    let tmp = tempfile::tempdir().unwrap();
    let mut automation = Automation::new(test_config(&tmp));
    let factory = MockFactory::failing("module not found");

    assert!(automation.boot(&factory, None).await.is_err());
    assert!(automation
        .failure_reason()
        .is_some_and(|r| r.contains("module not found")));
    assert!(matches!(
        automation.get_file("/game/x").await,
        Err(HarnessError::NotReady { .. })
    ));
}

#[tokio::test]
async fn shutdown_terminates_once() {
    let mut rig = booted_rig().await;
    rig.automation.shutdown().unwrap();
    assert_eq!(rig.emulator.terminate_calls(), 1);
    assert!(!rig.automation.is_ready());

    drop(rig.automation);
    assert_eq!(rig.emulator.terminate_calls(), 1);
}

#[tokio::test]
async fn dropping_the_facade_terminates_the_emulator() {
    let rig = booted_rig().await;
    let emulator = rig.emulator.clone();
    drop(rig);
    assert_eq!(emulator.terminate_calls(), 1);
}

// ---------------------------------------------------------------------------
// Keyboard input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn strokes_type_press_release_pairs() {
    let mut rig = booted_rig().await;
    rig.automation.send_strokes(&[":AB", "enter"]).await.unwrap();

    assert_eq!(
        codes_and_edges(&rig.emulator),
        vec![
            (65, true),
            (65, false),
            (66, true),
            (66, false),
            (13, true),
            (13, false),
        ]
    );
    assert_eq!(rig.clock.elapsed(), Duration::from_millis(600));
}

#[tokio::test]
async fn lowercase_literal_types_uppercase_codes() {
    let mut rig = booted_rig().await;
    rig.automation.send_strokes(&[":go2"]).await.unwrap();

    let downs: Vec<u16> = codes_and_edges(&rig.emulator)
        .into_iter()
        .filter(|(_, pressed)| *pressed)
        .map(|(code, _)| code)
        .collect();
    assert_eq!(downs, vec![71, 79, 50]);
}

#[tokio::test]
async fn release_follows_press_after_settle_delay() {
    let mut rig = booted_rig().await;
    rig.automation.send_strokes(&[":A"]).await.unwrap();

    let events = rig.emulator.key_events();
    assert_eq!(events.len(), 2);
    assert!(events[1].at - events[0].at >= Duration::from_millis(100));
}

#[tokio::test]
async fn invalid_token_dispatches_nothing() {
    let mut rig = booted_rig().await;
    let err = rig
        .automation
        .send_strokes(&[":AB", ":a-b", "enter"])
        .await
        .unwrap_err();

    match err {
        HarnessError::InvalidStroke {
            token, character, ..
        } => {
            assert_eq!(token, ":a-b");
            assert_eq!(character, Some('-'));
        }
        other => panic!("expected InvalidStroke, got {other:?}"),
    }
    assert!(rig.emulator.key_events().is_empty());
}

// ---------------------------------------------------------------------------
// Visual milestones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn watch_returns_once_title_appears() {
    let mut rig = booted_rig().await;
    let title = title_image();
    assert!(!rig.automation.has_image(&title).unwrap());

    rig.emulator.set_frame_after_reads(5, title_frame());
    rig.automation
        .watch_for_image(&title, None, None)
        .await
        .unwrap();

    assert!(rig.automation.has_image(&title).unwrap());
    assert_eq!(rig.clock.sleeps(), vec![Duration::from_millis(64); 6]);
}

#[tokio::test]
async fn watch_honors_explicit_interval() {
    let mut rig = booted_rig().await;
    rig.emulator.set_frame(title_frame());

    rig.automation
        .watch_for_image(&title_image(), None, Some(Duration::from_millis(250)))
        .await
        .unwrap();
    assert_eq!(rig.clock.sleeps(), vec![Duration::from_millis(250)]);
}

#[tokio::test]
async fn set_abort_signal_ends_watch() {
    let mut rig = booted_rig().await;
    let (tx, signal) = abort_signal();
    tx.send(true).unwrap();

    rig.automation
        .watch_for_image(&title_image(), Some(&signal), None)
        .await
        .unwrap();
    assert!(!rig.automation.has_image(&title_image()).unwrap());
}

#[tokio::test(start_paused = true)]
async fn deadline_aborts_a_watch_that_never_matches() {
    let tmp = tempfile::tempdir().unwrap();
    let emulator = MockEmulator::new(WIDTH, HEIGHT);
    let factory = MockFactory::new(emulator.clone());
    let mut automation = Automation::with_clock(test_config(&tmp), Arc::new(TokioClock));
    automation.boot(&factory, None).await.unwrap();

    let start = tokio::time::Instant::now();
    let deadline = abort_after(Duration::from_secs(2));
    automation
        .watch_for_image(&title_image(), Some(&deadline), None)
        .await
        .unwrap();

    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(2));
    assert!(waited < Duration::from_secs(2) + Duration::from_millis(128));
    assert!(emulator.frame_reads() > 0);
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn written_file_reads_back() {
    let mut rig = booted_rig().await;
    rig.automation
        .write_file("/game/save.dat", &[1, 2, 3])
        .unwrap();
    assert_eq!(
        rig.automation.get_file("/game/save.dat").await.unwrap(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn overwrite_replaces_contents() {
    let mut rig = booted_rig().await;
    rig.automation.write_file("/game/cfg.ini", b"a=1").unwrap();
    rig.automation.write_file("/game/cfg.ini", b"a=2").unwrap();
    assert_eq!(
        rig.automation.get_file("/game/cfg.ini").await.unwrap(),
        b"a=2"
    );
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let mut rig = booted_rig().await;
    let err = rig.automation.get_file("/missing").await.unwrap_err();
    assert!(matches!(err, HarnessError::FileNotFound { ref path } if path == "/missing"));
}

#[tokio::test]
async fn file_written_by_program_is_visible_after_sync() {
    let mut rig = booted_rig().await;
    rig.emulator.fs().guest_write("HISCORE.DAT", vec![0x10, 0x27]);

    assert_eq!(
        rig.automation.get_file("/game/HISCORE.DAT").await.unwrap(),
        vec![0x10, 0x27]
    );
    assert_eq!(rig.emulator.fs().sync_count(), 1);
}

#[tokio::test]
async fn relative_paths_are_rejected_on_both_halves() {
    let mut rig = booted_rig().await;

    let err = rig.automation.write_file("SAVE.DAT", &[1, 2, 3]).unwrap_err();
    assert!(matches!(err, HarnessError::InvalidPath { ref path } if path == "SAVE.DAT"));
    assert!(rig.emulator.fs().file("/game/SAVE.DAT").is_none());

    assert!(matches!(
        rig.automation.get_file("SAVE.DAT").await,
        Err(HarnessError::InvalidPath { .. })
    ));

    rig.automation.write_file("/game/SAVE.DAT", &[1, 2, 3]).unwrap();
    assert_eq!(
        rig.automation.get_file("/game/SAVE.DAT").await.unwrap(),
        vec![1, 2, 3]
    );
}
