use crate::error::{TelemetryError, TelemetryErrorExt};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Content type of [`Metrics::encode`] output.
pub const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Seconds spent handling one frame.
const TICK_BUCKETS: [f64; 10] = [0.0, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 1.0, 10.0];

/// Node metrics. Every series carries `capture_id` and `node_id` labels.
///
/// Cloning is cheap; all clones update the same series.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    satellites: Gauge,
    gps_fix: Gauge,
    frames: Counter,
    parse_errors: Counter,
    rotations: Counter,
    tick_time: Histogram,
}

impl Metrics {
    #[must_use]
    pub fn new(capture_id: &str, node_id: &str) -> Self {
        let labels = [
            (Cow::Borrowed("capture_id"), Cow::Owned(capture_id.to_owned())),
            (Cow::Borrowed("node_id"), Cow::Owned(node_id.to_owned())),
        ];
        let mut registry = Registry::with_labels(labels.into_iter());

        let satellites = Gauge::default();
        let gps_fix = Gauge::default();
        let frames = Counter::default();
        let parse_errors = Counter::default();
        let rotations = Counter::default();
        let tick_time = Histogram::new(TICK_BUCKETS.into_iter());

        registry.register(
            "gps_satellite_count",
            "Number of satellites in GPS fix",
            satellites.clone(),
        );
        registry.register("gps_fix", "1 when the last frame had a GPS fix", gps_fix.clone());
        registry.register("frames", "Frames parsed and written", frames.clone());
        registry.register("parse_errors", "Lines that failed to parse", parse_errors.clone());
        registry.register("rotations", "Capture file rotations", rotations.clone());
        registry.register(
            "heartbeat_tick_time",
            "Seconds spent handling one frame",
            tick_time.clone(),
        );

        Self {
            registry: Arc::new(registry),
            satellites,
            gps_fix,
            frames,
            parse_errors,
            rotations,
            tick_time,
        }
    }

    pub fn record_gps(&self, satellites: u16, fix: bool) {
        self.satellites.set(i64::from(satellites));
        self.gps_fix.set(i64::from(fix));
    }

    pub fn inc_frames(&self) {
        self.frames.inc();
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.inc();
    }

    pub fn inc_rotations(&self) {
        self.rotations.inc();
    }

    pub fn observe_tick(&self, elapsed: Duration) {
        self.tick_time.observe(elapsed.as_secs_f64());
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    #[must_use]
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.get()
    }

    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations.get()
    }

    /// Renders the registry in the OpenMetrics text format.
    ///
    /// # Errors
    /// Returns [`TelemetryError::Encode`] if a metric fails to render.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let mut out = String::new();
        encode(&mut out, &self.registry).context("Failed to encode metrics")?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_labelled_series() {
        let metrics = Metrics::new("CAPTURE1", "RPI-01");
        metrics.record_gps(7, true);
        metrics.inc_frames();
        metrics.inc_frames();
        metrics.observe_tick(Duration::from_micros(300));

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"gps_satellite_count{capture_id="CAPTURE1",node_id="RPI-01"} 7"#), "{text}");
        assert!(text.contains(r#"gps_fix{capture_id="CAPTURE1",node_id="RPI-01"} 1"#));
        assert!(text.contains(r#"frames_total{capture_id="CAPTURE1",node_id="RPI-01"} 2"#));
        assert!(text.contains("heartbeat_tick_time_bucket"));
        assert!(text.ends_with("# EOF\n"));
    }

    #[test]
    fn clones_share_series() {
        let metrics = Metrics::new("C", "N");
        let clone = metrics.clone();
        clone.inc_parse_errors();
        clone.inc_rotations();
        assert_eq!(metrics.parse_errors(), 1);
        assert_eq!(metrics.rotations(), 1);
        assert_eq!(metrics.frames(), 0);
    }
}
