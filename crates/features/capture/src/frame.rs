//! # Frame wire format
//!
//! The acquisition MCU emits one ASCII line per second:
//!
//! ```text
//! $<timestamp>,<flags>,<sample_rate>,<lat>,<lon>,<elevation>,<fix>,<speed>,<angle>,<count>,<v1>,...,<v_count>,<checksum>
//! ```
//!
//! The checksum is the decimal sum of all samples. Fields after the checksum are ignored.

use hb_domain::constants::FRAME_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::{FromStr, Split};

/// Why a line could not be turned into a [`Frame`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Missing {field}")]
    Missing { field: &'static str },

    #[error("Failed to parse {field}: {value:?}")]
    Invalid { field: &'static str, value: String },

    #[error("Checksum failed: line says {expected}, samples sum to {actual}")]
    Checksum { expected: i64, actual: i64 },
}

/// Status letters of the second field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFlags {
    gps_fix: bool,
    clipping: bool,
}

impl FrameFlags {
    /// `G` marks a GPS fix, `O` marks ADC clipping. Anything else is ignored.
    #[must_use]
    pub fn parse(field: &str) -> Self {
        Self { gps_fix: field.contains('G'), clipping: field.contains('O') }
    }

    #[must_use]
    pub const fn gps_fix(self) -> bool {
        self.gps_fix
    }

    #[must_use]
    pub const fn clipping(self) -> bool {
        self.clipping
    }
}

impl fmt::Display for FrameFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gps_fix {
            f.write_str("G")?;
        }
        if self.clipping {
            f.write_str("O")?;
        }
        Ok(())
    }
}

/// One second of samples plus the GPS state reported alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    timestamp: Option<i64>,
    flags: FrameFlags,
    sample_rate: f32,
    latitude: f32,
    longitude: f32,
    elevation: f32,
    fix: u16,
    speed: f32,
    angle: f32,
    samples: Vec<i16>,
}

/// Cursor over the comma separated fields of a line.
struct Fields<'a> {
    inner: Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self { inner: line.split(',') }
    }

    fn next(&mut self, field: &'static str) -> Result<&'a str, FrameError> {
        self.inner.next().map(str::trim).ok_or(FrameError::Missing { field })
    }

    fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T, FrameError> {
        let raw = self.next(field)?;
        raw.parse().map_err(|_| FrameError::Invalid { field, value: raw.to_owned() })
    }
}

impl Frame {
    /// Parses a single line. The leading `$` and the line terminator are optional.
    ///
    /// An unparsable timestamp is not an error: the frame is kept with
    /// [`Frame::timestamp`] set to `None` so the caller can annotate it.
    ///
    /// # Errors
    /// * [`FrameError::Missing`] if the line ends before a required field.
    /// * [`FrameError::Invalid`] if a numeric field does not parse.
    /// * [`FrameError::Checksum`] if the samples do not add up to the checksum.
    pub fn parse(line: &str) -> Result<Self, FrameError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let line = line.strip_prefix(FRAME_PREFIX).unwrap_or(line);
        let mut fields = Fields::new(line);

        let timestamp = fields.next("timestamp")?.parse::<i64>().ok();
        let flags = FrameFlags::parse(fields.next("flags")?);
        let sample_rate = fields.parse("sample rate")?;
        let latitude = fields.parse("latitude")?;
        let longitude = fields.parse("longitude")?;
        let elevation = fields.parse("elevation")?;
        let fix = fields.parse("fix")?;
        let speed = fields.parse("speed")?;
        let angle = fields.parse("angle")?;
        let count: u16 = fields.parse("data count")?;

        let mut samples = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            samples.push(fields.parse::<i16>("data")?);
        }

        let expected: i64 = fields.parse("checksum")?;
        let actual = samples.iter().copied().map(i64::from).sum();
        if expected != actual {
            return Err(FrameError::Checksum { expected, actual });
        }

        Ok(Self {
            timestamp,
            flags,
            sample_rate,
            latitude,
            longitude,
            elevation,
            fix,
            speed,
            angle,
            samples,
        })
    }

    /// MCU timestamp, `None` when the MCU sent something unparsable.
    #[must_use]
    pub const fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    #[must_use]
    pub const fn flags(&self) -> FrameFlags {
        self.flags
    }

    #[must_use]
    pub const fn has_gps_fix(&self) -> bool {
        self.flags.gps_fix
    }

    #[must_use]
    pub const fn is_clipping(&self) -> bool {
        self.flags.clipping
    }

    #[must_use]
    pub const fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[must_use]
    pub const fn latitude(&self) -> f32 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f32 {
        self.longitude
    }

    #[must_use]
    pub const fn elevation(&self) -> f32 {
        self.elevation
    }

    /// Number of satellites in the GPS fix.
    #[must_use]
    pub const fn satellite_count(&self) -> u16 {
        self.fix
    }

    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    #[must_use]
    pub const fn angle(&self) -> f32 {
        self.angle
    }

    /// Raw 10-bit ADC samples.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Samples centred on the ADC midpoint and scaled to roughly `-1.0..1.0`.
    #[must_use]
    pub fn normalized(&self) -> Vec<f64> {
        self.samples.iter().map(|&v| (f64::from(v) - 512.0) / 512.0).collect()
    }
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
