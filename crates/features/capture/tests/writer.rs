use hb_capture::{CaptureError, CaptureMetadata, CaptureWriter, RotatingCapture};
use std::fs;
use tempfile::tempdir;

fn metadata() -> CaptureMetadata {
    let mut meta = CaptureMetadata::new("Ab3dEf7hJk9mNp2q", 20_000.0);
    meta.set("NODE_ID", "RPI-01");
    meta
}

#[test]
fn create_names_file_and_writes_header() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("data");
    let mut meta = metadata();

    let writer = CaptureWriter::create(&dir, &mut meta).unwrap();

    let name = writer.file_name().unwrap().to_owned();
    assert!(name.starts_with("RPI-01_"), "{name}");
    assert!(name.ends_with("_Ab3dEf7h.csv"), "{name}");
    assert_eq!(meta.get("VERSION"), Some("3"));
    assert!(meta.get("CREATED").is_some());

    let contents = fs::read_to_string(writer.path()).unwrap();
    let header = CaptureMetadata::parse(&contents).unwrap();
    assert_eq!(header, meta);
    assert_eq!(writer.lines_written(), 0);
}

#[test]
fn unknown_node_when_id_missing() {
    let tmp = tempdir().unwrap();
    let mut meta = CaptureMetadata::new("Zz9yXx8wVv7uTt6s", 1.0);
    let writer = CaptureWriter::create(tmp.path(), &mut meta).unwrap();
    assert!(writer.file_name().unwrap().starts_with("UNKNOWN_"));
}

#[test]
fn lines_are_timestamped_and_terminated() {
    let tmp = tempdir().unwrap();
    let mut meta = metadata();
    let mut writer = CaptureWriter::create(tmp.path(), &mut meta).unwrap();

    writer.write_line("1,G,20000").unwrap();
    writer.write_line("2,G,20000\n").unwrap();
    writer.comment("ERR Failed to parse data point: Missing flags").unwrap();
    assert_eq!(writer.lines_written(), 3);

    let contents = fs::read_to_string(writer.path()).unwrap();
    let body: Vec<&str> = contents.lines().skip_while(|l| *l != "## END METADATA ##").skip(1).collect();
    assert_eq!(body.len(), 3);

    let (stamp, rest) = body[0].split_once(',').unwrap();
    assert!(stamp.parse::<f64>().unwrap() > 1_600_000_000.0);
    assert_eq!(rest, "1,G,20000");
    assert!(body[1].ends_with(",2,G,20000"));
    assert!(body[2].ends_with(",# ERR Failed to parse data point: Missing flags"));
    assert!(contents.ends_with('\n'));
    assert!(!contents.contains("\n\n"));
}

#[test]
fn name_collisions_get_a_suffix() {
    let tmp = tempdir().unwrap();
    let mut meta = metadata();

    let first = CaptureWriter::create(tmp.path(), &mut meta).unwrap();
    let second = CaptureWriter::create(tmp.path(), &mut meta).unwrap();

    assert_ne!(first.path(), second.path());
    // Both files exist and carry their own header.
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
}

#[test]
fn rotation_keeps_capture_id() {
    let tmp = tempdir().unwrap();
    let mut capture = RotatingCapture::open(tmp.path(), metadata(), 2).unwrap();
    let first = capture.writer().path().to_path_buf();

    assert!(!capture.write_line("1").unwrap());
    capture.comment("note").unwrap();
    assert!(capture.write_line("2").unwrap());
    assert_eq!(capture.rotations(), 1);

    let second = capture.writer().path().to_path_buf();
    assert_ne!(first, second);
    assert_eq!(capture.writer().lines_written(), 0);

    let old = fs::read_to_string(&first).unwrap();
    assert_eq!(old.lines().filter(|l| !l.starts_with('#')).count(), 3);

    let new = CaptureMetadata::parse(&fs::read_to_string(&second).unwrap()).unwrap();
    assert_eq!(new.capture_id(), "Ab3dEf7hJk9mNp2q");
    assert_eq!(new.get("NODE_ID"), Some("RPI-01"));
}

#[test]
fn zero_rotation_is_rejected() {
    let tmp = tempdir().unwrap();
    let err = RotatingCapture::open(tmp.path(), metadata(), 0).unwrap_err();
    assert!(matches!(err, CaptureError::Config { .. }));
}

#[test]
fn unwritable_directory_is_an_io_error() {
    let tmp = tempdir().unwrap();
    let blocker = tmp.path().join("file");
    fs::write(&blocker, "x").unwrap();

    let err = CaptureWriter::create(&blocker.join("data"), &mut metadata()).unwrap_err();
    assert!(matches!(err, CaptureError::Io { context: Some(_), .. }));
}
