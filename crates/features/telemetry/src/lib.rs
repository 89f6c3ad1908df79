//! Telemetry feature: what the node tells the outside world about itself.
//!
//! * [`Metrics`] is the Prometheus registry scraped from `/metrics`.
//! * [`StatusLed`] abstracts the RGB LED on the enclosure; [`GpioLed`] drives it
//!   on a Raspberry Pi when the `gpio` feature is on, [`NoopLed`] everywhere else.
//! * [`StatusHub`] ties both together with the last received frame and
//!   announces new frames on the event bus.

mod error;
pub mod led;
pub mod metrics;
pub mod status;

pub use error::{TelemetryError, TelemetryErrorExt};
#[cfg(all(feature = "gpio", target_os = "linux"))]
pub use led::GpioLed;
pub use led::{LedColor, NoopLed, StatusLed};
pub use metrics::{Metrics, OPENMETRICS_CONTENT_TYPE};
pub use status::{FrameReceived, StatusHub};
