use hb_logger::{FileSink, LevelFilter, Logger};
use std::fs;
use std::time::Duration;

#[test]
fn node_log_lands_in_prefixed_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("heartbeat-acquisition")
        .console(false)
        .level(LevelFilter::DEBUG)
        .file(FileSink::new(&log_dir).keep(2))
        .init()?;
    assert!(logger.writes_files());

    tracing::debug!(capture_id = "TESTCAPTURE00001", "Created capture file");
    tracing::trace!("filtered out below debug");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .ok_or("no log file written")?;

    let name = log_file.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    assert!(name.starts_with("heartbeat-acquisition"), "{name}");

    let contents = fs::read_to_string(&log_file)?;
    assert!(contents.contains("Created capture file"), "{contents}");
    assert!(contents.contains("TESTCAPTURE00001"));
    assert!(!contents.contains("filtered out below debug"));
    assert!(!contents.contains("\u{1b}["), "file output must not carry ANSI codes");

    // The global subscriber is taken now.
    let err = Logger::builder().name("xtask").init().unwrap_err();
    assert!(matches!(err, hb_logger::LoggerError::Subscriber { .. }), "{err}");
    Ok(())
}
