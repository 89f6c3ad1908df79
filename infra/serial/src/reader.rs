use crate::error::SerialError;
use crate::source::LineSource;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Pause after a non-fatal read error so a wedged port does not spin a core.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Read errors in a row, with no successful read between them, before the device
/// counts as gone. An unplugged USB adapter keeps answering with EIO instead of EOF.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// What the reader task reports to the acquisition loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialEvent {
    /// One line exactly as received, terminator included.
    Line(String),
    /// The device is gone; no further events follow.
    Disconnected(String),
}

/// Drives `source` on the blocking pool until it disconnects, the receiver is
/// dropped, or `token` is cancelled.
///
/// Cancellation is observed between reads, so it takes effect within one read timeout.
pub fn spawn_reader<S: LineSource>(
    mut source: S,
    tx: mpsc::Sender<SerialEvent>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut failures = 0u32;
        while !token.is_cancelled() {
            let result = source.read_line();
            if result.is_ok() {
                failures = 0;
            }
            let event = match result {
                Ok(Some(line)) => SerialEvent::Line(line),
                Ok(None) => continue,
                Err(SerialError::Disconnected { message, context }) => {
                    error!(reason = %message, context = context.as_deref(), "Serial device disconnected");
                    let _ = tx.blocking_send(SerialEvent::Disconnected(message.into_owned()));
                    return;
                },
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_ERRORS {
                        error!(error = %e, failures, "Serial device keeps failing, giving up");
                        let reason = format!("{failures} read errors in a row, last: {e}");
                        let _ = tx.blocking_send(SerialEvent::Disconnected(reason));
                        return;
                    }
                    warn!(error = %e, failures, "Serial read failed, retrying");
                    std::thread::sleep(ERROR_BACKOFF);
                    continue;
                },
            };

            if tx.blocking_send(event).is_err() {
                debug!("Serial consumer dropped, stopping reader");
                return;
            }
        }
        debug!("Serial reader cancelled");
    })
}
