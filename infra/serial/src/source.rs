use crate::error::{SerialError, SerialErrorExt};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use tracing::{debug, info};

/// A blocking producer of text lines.
pub trait LineSource: Send + std::fmt::Debug + 'static {
    /// Reads the next complete line, terminator included.
    ///
    /// `Ok(None)` means no full line arrived before the read timeout; partial
    /// data is kept for the next call.
    ///
    /// # Errors
    /// * [`SerialError::Disconnected`] when the device is gone; callers should stop reading.
    /// * [`SerialError::Io`] for anything else, usually transient (e.g. garbled bytes).
    fn read_line(&mut self) -> Result<Option<String>, SerialError>;
}

impl LineSource for Box<dyn LineSource> {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        (**self).read_line()
    }
}

/// Line source over any buffered reader; end of stream counts as a disconnect.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    pending: String,
}

impl<R: BufRead> ReaderSource<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader, pending: String::new() }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead + Send + std::fmt::Debug + 'static> LineSource for ReaderSource<R> {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        match self.reader.read_line(&mut self.pending) {
            Ok(0) => Err(disconnected("end of stream")),
            Ok(_) if self.pending.ends_with('\n') => Ok(Some(std::mem::take(&mut self.pending))),
            // Data ran out mid-line; the rest arrives with the next read.
            Ok(_) => Ok(None),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(None)
            },
            Err(e) if is_disconnect(&e) => Err(disconnected(e.to_string())),
            Err(e) => Err(e).context("Failed to read line"),
        }
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted
    )
}

fn disconnected(message: impl Into<std::borrow::Cow<'static, str>>) -> SerialError {
    SerialError::Disconnected {
        message: message.into(),
        context: Some("Unable to reach the data collection port".into()),
    }
}

/// The MCU's UART, opened through the `serialport` crate.
pub struct SerialPortSource {
    name: String,
    inner: ReaderSource<BufReader<Box<dyn SerialPort>>>,
}

impl SerialPortSource {
    /// Opens `port` at `baud_rate`. Reads block for at most `timeout`, which also bounds
    /// how long cancelling a reader takes.
    ///
    /// # Errors
    /// Returns [`SerialError::Port`] if the device does not exist, is busy, or rejects the settings.
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self, SerialError> {
        info!(port, baud_rate, timeout_ms = timeout.as_millis(), "Opening serial port");
        let handle = serialport::new(port, baud_rate)
            .timeout(timeout)
            .open()
            .context(format!("Unable to open serial port {port}"))?;

        Ok(Self { name: port.to_owned(), inner: ReaderSource::new(BufReader::new(handle)) })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LineSource for SerialPortSource {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        self.inner.read_line()
    }
}

impl std::fmt::Debug for SerialPortSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortSource").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Drop for SerialPortSource {
    fn drop(&mut self) {
        debug!(port = %self.name, "Closing serial port");
    }
}

/// Names of the serial ports visible on this host, for diagnostics.
///
/// # Errors
/// Returns [`SerialError::Port`] if enumeration is not supported or fails.
pub fn available_ports() -> Result<Vec<String>, SerialError> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
