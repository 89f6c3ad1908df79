//! The acquisition loop: serial lines in, capture file lines and status updates out.

use hb_capture::{CaptureError, Frame, RotatingCapture, epoch_seconds};
use hb_domain::constants::FRAME_PREFIX;
use hb_serial::SerialEvent;
use hb_telemetry::{LedColor, StatusHub};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

/// Why [`Pipeline::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested.
    Cancelled,
    /// The serial device went away.
    Disconnected,
    /// The reader task ended without reporting a disconnect.
    ReaderGone,
}

#[derive(Debug)]
pub struct Pipeline {
    capture: RotatingCapture,
    hub: StatusHub,
}

impl Pipeline {
    #[must_use]
    pub const fn new(capture: RotatingCapture, hub: StatusHub) -> Self {
        Self { capture, hub }
    }

    /// Consumes serial events until cancellation or disconnect.
    ///
    /// # Errors
    /// Returns [`CaptureError`] if the capture file cannot be written; acquisition stops.
    pub async fn run(
        &mut self,
        rx: &mut mpsc::Receiver<SerialEvent>,
        token: &CancellationToken,
    ) -> Result<StopReason, CaptureError> {
        loop {
            let event = tokio::select! {
                biased;
                () = token.cancelled() => return Ok(StopReason::Cancelled),
                event = rx.recv() => event,
            };

            match event {
                Some(event) => {
                    if let Some(reason) = self.handle(event)? {
                        return Ok(reason);
                    }
                },
                None => return Ok(StopReason::ReaderGone),
            }
        }
    }

    /// Handles one event; `Some` means the loop has to stop.
    ///
    /// # Errors
    /// Returns [`CaptureError`] if the capture file cannot be written.
    pub fn handle(&mut self, event: SerialEvent) -> Result<Option<StopReason>, CaptureError> {
        match event {
            SerialEvent::Line(line) => {
                self.handle_line(&line)?;
                Ok(None)
            },
            SerialEvent::Disconnected(reason) => {
                self.hub.set_led(LedColor::Red);
                error!(%reason, "Unable to connect to data collection port, exiting");
                Ok(Some(StopReason::Disconnected))
            },
        }
    }

    /// Handles one raw line from the MCU.
    ///
    /// Lines without the frame prefix (boot messages, noise) are ignored. Lines that fail to
    /// parse are still written, followed by an `ERR` comment, so they can be recovered later.
    ///
    /// # Errors
    /// Returns [`CaptureError`] if the capture file cannot be written.
    pub fn handle_line(&mut self, line: &str) -> Result<(), CaptureError> {
        if !line.starts_with(FRAME_PREFIX) {
            trace!(line = line.trim_end(), "Ignoring non-frame line");
            return Ok(());
        }

        self.hub.set_led(LedColor::Green);
        let tick = Instant::now();

        let frame = match Frame::parse(line) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to parse data point");
                self.capture.write_unrotated(line)?;
                self.capture.comment(&format!("ERR Failed to parse data point: {e}"))?;
                self.hub.set_led(LedColor::Red);
                self.hub.metrics().inc_parse_errors();
                return Ok(());
            },
        };

        if frame.timestamp().is_none() {
            self.capture.comment(&format!(
                "ERR Missing timestamp, time as of writing is {}",
                epoch_seconds()
            ))?;
        }

        let data = line.strip_prefix(FRAME_PREFIX).unwrap_or(line);
        if self.capture.write_line(data)? {
            info!(rotations = self.capture.rotations(), "Rotating");
            self.hub.set_led(LedColor::Cyan);
            self.hub.metrics().inc_rotations();
        }

        let frame = self.hub.push_frame(frame);
        if !frame.has_gps_fix() {
            warn!("No GPS fix, data may be misaligned for this second");
            self.hub.set_led(LedColor::Yellow);
        }

        self.hub.metrics().observe_tick(tick.elapsed());
        Ok(())
    }

    #[must_use]
    pub const fn status(&self) -> &StatusHub {
        &self.hub
    }

    #[must_use]
    pub const fn capture(&self) -> &RotatingCapture {
        &self.capture
    }

    /// Flushes the current capture file.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the flush fails.
    pub fn finish(mut self) -> Result<(), CaptureError> {
        self.capture.flush()?;
        info!(path = %self.capture.writer().path().display(), "Capture file closed");
        Ok(())
    }
}
