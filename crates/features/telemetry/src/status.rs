use crate::led::{LedColor, StatusLed};
use crate::metrics::Metrics;
use hb_capture::Frame;
use hb_event_bus::EventBus;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{trace, warn};

/// Broadcast on the event bus for every frame that made it into a capture file.
#[derive(Debug, Clone)]
pub struct FrameReceived {
    pub frame: Arc<Frame>,
}

/// Shared view of the node's state: LED, metrics and the most recent frame.
///
/// Cheap to clone; all clones see the same state.
#[derive(Debug, Clone)]
pub struct StatusHub {
    inner: Arc<StatusHubInner>,
}

#[derive(Debug)]
struct StatusHubInner {
    metrics: Metrics,
    events: EventBus,
    led: Mutex<Box<dyn StatusLed>>,
    color: RwLock<LedColor>,
    last_frame: RwLock<Option<Arc<Frame>>>,
}

impl StatusHub {
    #[must_use]
    pub fn new(metrics: Metrics, led: impl StatusLed, events: EventBus) -> Self {
        Self {
            inner: Arc::new(StatusHubInner {
                metrics,
                events,
                led: Mutex::new(Box::new(led)),
                color: RwLock::new(LedColor::Off),
                last_frame: RwLock::new(None),
            }),
        }
    }

    /// Switches the LED. Hardware failures are logged, never propagated: a dead LED
    /// must not stop acquisition.
    pub fn set_led(&self, color: LedColor) {
        if *self.inner.color.read() == color {
            return;
        }

        if let Err(e) = self.inner.led.lock().set(color) {
            warn!(%color, error = %e, "Failed to set status LED");
            return;
        }
        *self.inner.color.write() = color;
        trace!(%color, "Status LED changed");

        if let Err(e) = self.inner.events.publish_watch(color) {
            warn!(error = %e, "Failed to publish LED color");
        }
    }

    #[must_use]
    pub fn led_color(&self) -> LedColor {
        *self.inner.color.read()
    }

    /// Stores `frame` as the latest one, updates the GPS gauges and the frame counter,
    /// and broadcasts [`FrameReceived`].
    pub fn push_frame(&self, frame: Frame) -> Arc<Frame> {
        let frame = Arc::new(frame);
        let metrics = &self.inner.metrics;
        metrics.record_gps(frame.satellite_count(), frame.has_gps_fix());
        metrics.inc_frames();

        *self.inner.last_frame.write() = Some(frame.clone());

        if let Err(e) = self.inner.events.publish(FrameReceived { frame: frame.clone() }) {
            warn!(error = %e, "Failed to publish frame");
        }
        frame
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.inner.last_frame.read().clone()
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }
}
