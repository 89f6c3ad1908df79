#![allow(dead_code)]

use hb_capture::{CaptureMetadata, RotatingCapture};
use hb_domain::constants::metadata::{END, NODE_ID};
use hb_event_bus::EventBus;
use hb_telemetry::{Metrics, NoopLed, StatusHub};
use std::path::Path;

pub const CAPTURE_ID: &str = "TESTCAPTURE00001";
pub const NODE: &str = "RPI-01";

pub const FIX_LINE: &str = "$1712000000,G,20000,52.37,4.89,3.5,9,1.25,180,4,510,512,514,0,1536\n";
pub const NO_FIX_LINE: &str = "$1712000001,-,20000,0,0,0,0,0,0,1,5,5\n";
pub const NO_TIMESTAMP_LINE: &str = "$NaN,G,20000,0,0,0,4,0,0,1,7,7\n";
pub const BAD_CHECKSUM_LINE: &str = "$1712000002,G,20000,0,0,0,4,0,0,2,1,2,4\n";

pub fn hub() -> StatusHub {
    StatusHub::new(Metrics::new(CAPTURE_ID, NODE), NoopLed, EventBus::new())
}

pub fn capture(dir: &Path, rotate_every: u64) -> RotatingCapture {
    let mut metadata = CaptureMetadata::new(CAPTURE_ID, 20_000.0);
    metadata.set(NODE_ID, NODE);
    RotatingCapture::open(dir, metadata, rotate_every).unwrap()
}

/// Lines after the metadata header, with the host epoch prefix removed.
pub fn body(path: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(path).unwrap();
    text.lines()
        .skip_while(|line| *line != END)
        .skip(1)
        .map(|line| line.split_once(',').map_or(line, |(_, rest)| rest).to_owned())
        .collect()
}
