mod common;

use common::*;
use hb_serial::SerialEvent;
use hb_telemetry::LedColor;
use heartbeat_acquisition::{Pipeline, StopReason};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn pipeline(dir: &std::path::Path, rotate_every: u64) -> Pipeline {
    Pipeline::new(capture(dir, rotate_every), hub())
}

#[test]
fn frame_lines_are_written_without_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    pipeline.handle_line(FIX_LINE).unwrap();

    let lines = body(pipeline.capture().writer().path());
    assert_eq!(lines, vec![FIX_LINE.trim_start_matches('$').trim_end().to_owned()]);

    let status = pipeline.status();
    assert_eq!(status.led_color(), LedColor::Green);
    assert_eq!(status.metrics().frames(), 1);
    assert_eq!(status.last_frame().unwrap().timestamp(), Some(1_712_000_000));
}

#[test]
fn noise_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    pipeline.handle_line("MCU boot v1.2\n").unwrap();
    pipeline.handle_line("\n").unwrap();

    assert!(body(pipeline.capture().writer().path()).is_empty());
    assert_eq!(pipeline.status().led_color(), LedColor::Off);
    assert_eq!(pipeline.status().metrics().frames(), 0);
}

#[test]
fn unparsable_frame_is_kept_and_annotated() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    pipeline.handle_line(BAD_CHECKSUM_LINE).unwrap();

    let lines = body(pipeline.capture().writer().path());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], BAD_CHECKSUM_LINE.trim_end());
    assert!(lines[1].starts_with("# ERR Failed to parse data point: "), "{}", lines[1]);

    let status = pipeline.status();
    assert_eq!(status.led_color(), LedColor::Red);
    assert_eq!(status.metrics().parse_errors(), 1);
    assert_eq!(status.metrics().frames(), 0);
    assert!(status.last_frame().is_none());
}

#[test]
fn missing_timestamp_is_annotated_before_the_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    pipeline.handle_line(NO_TIMESTAMP_LINE).unwrap();

    let lines = body(pipeline.capture().writer().path());
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("# ERR Missing timestamp, time as of writing is "));
    assert_eq!(lines[1], NO_TIMESTAMP_LINE.trim_start_matches('$').trim_end());
    assert_eq!(pipeline.status().metrics().frames(), 1);
}

#[test]
fn missing_gps_fix_turns_led_yellow() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    pipeline.handle_line(NO_FIX_LINE).unwrap();
    assert_eq!(pipeline.status().led_color(), LedColor::Yellow);

    pipeline.handle_line(FIX_LINE).unwrap();
    assert_eq!(pipeline.status().led_color(), LedColor::Green);
}

#[test]
fn full_file_rotates_and_turns_led_cyan() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 2);
    let first = pipeline.capture().writer().path().to_path_buf();

    pipeline.handle_line(FIX_LINE).unwrap();
    pipeline.handle_line(FIX_LINE).unwrap();

    assert_eq!(pipeline.status().led_color(), LedColor::Cyan);
    assert_eq!(pipeline.status().metrics().rotations(), 1);
    assert_ne!(pipeline.capture().writer().path(), first);
    assert_eq!(body(&first).len(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn disconnect_stops_with_red_led() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    let reason = pipeline.handle(SerialEvent::Disconnected("gone".into())).unwrap();

    assert_eq!(reason, Some(StopReason::Disconnected));
    assert_eq!(pipeline.status().led_color(), LedColor::Red);
}

#[tokio::test]
async fn run_drains_lines_until_disconnect() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);
    let (tx, mut rx) = mpsc::channel(8);

    tx.send(SerialEvent::Line(FIX_LINE.to_owned())).await.unwrap();
    tx.send(SerialEvent::Line(NO_FIX_LINE.to_owned())).await.unwrap();
    tx.send(SerialEvent::Disconnected("unplugged".into())).await.unwrap();

    let reason = pipeline.run(&mut rx, &CancellationToken::new()).await.unwrap();

    assert_eq!(reason, StopReason::Disconnected);
    assert_eq!(pipeline.status().metrics().frames(), 2);
    pipeline.finish().unwrap();
}

#[tokio::test]
async fn run_stops_on_cancel_and_on_reader_exit() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(dir.path(), 100);

    let (_tx, mut rx) = mpsc::channel::<SerialEvent>(1);
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(pipeline.run(&mut rx, &token).await.unwrap(), StopReason::Cancelled);

    let (tx, mut rx) = mpsc::channel::<SerialEvent>(1);
    drop(tx);
    let reason = pipeline.run(&mut rx, &CancellationToken::new()).await.unwrap();
    assert_eq!(reason, StopReason::ReaderGone);
}
