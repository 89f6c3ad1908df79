//! # Heartbeat Acquisition
//!
//! Reads one-second frames from the acquisition MCU over a serial port, stores the
//! raw lines in rotating capture files and serves the node's state over HTTP.
//!
//! ## Example
//! ```no_run
//! use heartbeat_acquisition::Node;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Node::builder().build()?.run().await
//! }
//! ```

mod monitor;
pub mod pipeline;
pub mod router;
mod shutdown;

pub use pipeline::{Pipeline, StopReason};
pub use router::AppState;

use anyhow::{Context, Result};
use hb_capture::{CaptureMetadata, RotatingCapture};
use hb_domain::config::{NodeConfig, StatusConfig};
use hb_domain::constants::metadata::NODE_ID;
use hb_event_bus::EventBus;
use hb_serial::{LineSource, SerialPortSource, spawn_reader};
use hb_telemetry::{LedColor, Metrics, NoopLed, StatusHub, StatusLed};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Lines buffered between the serial reader and the acquisition loop.
const SERIAL_BUFFER: usize = 32;

/// The MCU sends a frame every second; this much silence is worth a warning.
const STALE_AFTER: Duration = Duration::from_secs(5);

/// A fluent builder for configuring and initializing the [`Node`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct NodeBuilder {
    cfg: NodeConfig,
    source: Option<Box<dyn LineSource>>,
    led: Option<Box<dyn StatusLed>>,
}

impl NodeBuilder {
    pub fn config(mut self, cfg: NodeConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Reads frames from `source` instead of opening `acquire.serial_port`.
    pub fn source(mut self, source: impl LineSource) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Uses `led` instead of the one described by the `status` section.
    pub fn led(mut self, led: impl StatusLed) -> Self {
        self.led = Some(Box::new(led));
        self
    }

    /// Opens the serial port and the first capture file.
    ///
    /// The LED shows magenta from here until the loop is ready.
    ///
    /// # Errors
    /// Returns an error if the serial port cannot be opened or the data directory is unusable.
    pub fn build(self) -> Result<Node> {
        let acquire = &self.cfg.acquire;
        info!(node_id = %acquire.node_id, "Using node id");

        let mut metadata = CaptureMetadata::generate(acquire.sample_rate);
        metadata.set(NODE_ID, acquire.node_id.as_str());

        let metrics = Metrics::new(metadata.capture_id(), &acquire.node_id);
        let led = self.led.unwrap_or_else(|| status_led(&self.cfg.status));
        let hub = StatusHub::new(metrics, led, EventBus::new());
        hub.set_led(LedColor::Magenta);

        let source = match self.source {
            Some(source) => source,
            None => Box::new(open_serial(&self.cfg)?),
        };

        let capture = RotatingCapture::open(&acquire.data_dir, metadata, acquire.rotate_every)
            .context("Failed to open the first capture file")?;

        Ok(Node { cfg: self.cfg, hub, capture, source })
    }
}

fn open_serial(cfg: &NodeConfig) -> Result<SerialPortSource> {
    let acquire = &cfg.acquire;
    SerialPortSource::open(
        &acquire.serial_port,
        acquire.baud_rate,
        Duration::from_millis(acquire.timeout_ms),
    )
    .inspect_err(|_| match hb_serial::available_ports() {
        Ok(ports) => warn!(?ports, "Serial ports visible on this host"),
        Err(e) => warn!(error = %e, "Could not list serial ports"),
    })
    .context("Unable to open serial port")
}

#[cfg(all(feature = "rpi", target_os = "linux"))]
fn status_led(status: &StatusConfig) -> Box<dyn StatusLed> {
    if !status.led {
        return Box::new(NoopLed);
    }
    match hb_telemetry::GpioLed::new(status.pin_red, status.pin_green, status.pin_blue) {
        Ok(led) => Box::new(led),
        Err(e) => {
            warn!(error = %e, "Status LED unavailable, continuing without it");
            Box::new(NoopLed)
        },
    }
}

#[cfg(not(all(feature = "rpi", target_os = "linux")))]
fn status_led(status: &StatusConfig) -> Box<dyn StatusLed> {
    if status.led {
        info!("Built without GPIO support, status LED disabled");
    }
    Box::new(NoopLed)
}

/// A fully initialized node ready to run.
#[must_use = "call .run().await to start acquiring"]
#[derive(Debug)]
pub struct Node {
    cfg: NodeConfig,
    hub: StatusHub,
    capture: RotatingCapture,
    source: Box<dyn LineSource>,
}

impl Node {
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// Runs until Ctrl+C, SIGTERM or a serial disconnect.
    ///
    /// # Errors
    /// Returns an error if the HTTP listener cannot bind or a capture write fails.
    pub async fn run(self) -> Result<()> {
        let token = CancellationToken::new();
        shutdown::cancel_on_signal(token.clone());
        self.run_until(token).await
    }

    /// Runs until `token` is cancelled or the serial device disconnects.
    ///
    /// On the way out the HTTP server drains, the capture file is flushed and `token`
    /// is cancelled so every task spawned here stops.
    ///
    /// # Errors
    /// Returns an error if the HTTP listener cannot bind or a capture write fails.
    pub async fn run_until(self, token: CancellationToken) -> Result<()> {
        let started = Instant::now();
        let Self { cfg, hub, capture, source } = self;

        let address = SocketAddr::new(cfg.web.address, cfg.web.port);
        let listener =
            TcpListener::bind(address).await.with_context(|| format!("Failed to bind {address}"))?;
        info!(address = %listener.local_addr()?, "Web service listening");

        let state = AppState {
            hub: hub.clone(),
            node_id: Arc::from(cfg.acquire.node_id.as_str()),
            capture_id: Arc::from(capture.metadata().capture_id()),
        };
        let server = tokio::spawn(
            axum::serve(listener, router::init(state))
                .with_graceful_shutdown(token.clone().cancelled_owned())
                .into_future(),
        );
        let monitor = tokio::spawn(monitor::watch_frames(hub.events().clone(), STALE_AFTER, token.clone()));
        let led_log = tokio::spawn(monitor::follow_led(hub.events().clone(), token.clone()));

        let (tx, mut rx) = mpsc::channel(SERIAL_BUFFER);
        // The reader is not awaited: it may sit in a blocking read until its timeout.
        let _reader = spawn_reader(source, tx, token.child_token());

        let mut pipeline = Pipeline::new(capture, hub);
        pipeline.status().set_led(LedColor::White);
        info!("Acquisition started");

        let outcome = pipeline.run(&mut rx, &token).await;
        token.cancel();

        let flushed = pipeline.finish();
        if let Err(e) = server.await.context("Web service task failed")? {
            error!(error = %e, "Web service exited with an error");
        }
        monitor.await.context("Frame monitor task failed")?;
        led_log.await.context("LED log task failed")?;

        let reason = outcome.context("Acquisition loop failed")?;
        flushed.context("Failed to flush the capture file")?;
        info!(?reason, ran_for = %format_uptime(started.elapsed()), "Exiting");
        Ok(())
    }

    #[must_use]
    pub const fn status(&self) -> &StatusHub {
        &self.hub
    }

    #[must_use]
    pub fn capture_id(&self) -> &str {
        self.capture.metadata().capture_id()
    }
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, secs % 3600 / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_is_human_readable() {
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 25 * 60 + 7)), "3h 25m 7s");
        assert_eq!(format_uptime(Duration::from_millis(900)), "0h 0m 0s");
    }
}
