use hb_serial::{
    LineSource, MAX_CONSECUTIVE_ERRORS, ReaderSource, SerialError, SerialEvent, spawn_reader,
};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Never produces data, like an idle port hitting its read timeout.
#[derive(Debug)]
struct Idle {
    reads: Arc<AtomicUsize>,
}

impl LineSource for Idle {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(5));
        Ok(None)
    }
}

/// Fails once with a transient error, then yields a line and disconnects.
#[derive(Debug)]
struct Flaky {
    calls: usize,
}

impl LineSource for Flaky {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        self.calls += 1;
        match self.calls {
            1 => Err(std::io::Error::other("framing error").into()),
            2 => Ok(Some("$ok\n".to_owned())),
            _ => Err(SerialError::Disconnected { message: "unplugged".into(), context: None }),
        }
    }
}

/// An unplugged USB adapter: every read fails with EIO.
#[derive(Debug)]
struct Unplugged {
    reads: Arc<AtomicUsize>,
}

impl LineSource for Unplugged {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Err(std::io::Error::from_raw_os_error(5).into())
    }
}

#[tokio::test]
async fn forwards_lines_in_order_then_disconnect() {
    let (tx, mut rx) = mpsc::channel(4);
    let source = ReaderSource::new(Cursor::new("noise\n$1,G\n$2,G\n"));
    let handle = spawn_reader(source, tx, CancellationToken::new());

    assert_eq!(rx.recv().await, Some(SerialEvent::Line("noise\n".to_owned())));
    assert_eq!(rx.recv().await, Some(SerialEvent::Line("$1,G\n".to_owned())));
    assert_eq!(rx.recv().await, Some(SerialEvent::Line("$2,G\n".to_owned())));
    assert_eq!(rx.recv().await, Some(SerialEvent::Disconnected("end of stream".to_owned())));
    assert_eq!(rx.recv().await, None);
    handle.await.unwrap();
}

#[tokio::test]
async fn transient_errors_do_not_stop_the_reader() {
    let (tx, mut rx) = mpsc::channel(4);
    spawn_reader(Flaky { calls: 0 }, tx, CancellationToken::new());

    assert_eq!(rx.recv().await, Some(SerialEvent::Line("$ok\n".to_owned())));
    assert_eq!(rx.recv().await, Some(SerialEvent::Disconnected("unplugged".to_owned())));
}

#[tokio::test]
async fn cancellation_stops_an_idle_reader() {
    let reads = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::channel(1);
    let token = CancellationToken::new();
    let handle = spawn_reader(Idle { reads: reads.clone() }, tx, token.clone());

    tokio::time::sleep(Duration::from_millis(30)).await;
    token.cancel();

    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert!(reads.load(Ordering::Relaxed) > 0);
    // Sender dropped with the task.
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn dropped_receiver_stops_the_reader() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let source = ReaderSource::new(Cursor::new("$1\n$2\n$3\n"));
    let handle = spawn_reader(source, tx, CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn persistent_io_errors_end_in_a_disconnect() {
    let reads = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::channel(1);
    let handle = spawn_reader(Unplugged { reads: reads.clone() }, tx, CancellationToken::new());

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    let Some(SerialEvent::Disconnected(reason)) = event else {
        panic!("expected a disconnect, got {event:?}");
    };
    assert!(reason.starts_with(&format!("{MAX_CONSECUTIVE_ERRORS} read errors in a row")), "{reason}");

    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert_eq!(reads.load(Ordering::Relaxed), MAX_CONSECUTIVE_ERRORS as usize);
    assert_eq!(rx.recv().await, None);
}
