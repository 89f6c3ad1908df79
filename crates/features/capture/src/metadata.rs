use crate::error::CaptureError;
use hb_domain::constants::metadata as keys;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Header block written at the top of every capture file.
///
/// ```text
/// ## BEGIN METADATA ##
/// # CAPTURE_ID		V7kqNwd3JzPbH2Ra
/// # SAMPLE_RATE		20000
/// # CREATED		2024-04-01T12:00:00+00:00
/// ## END METADATA ##
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureMetadata {
    capture_id: String,
    sample_rate: f64,
    extras: BTreeMap<String, String>,
}

impl CaptureMetadata {
    #[must_use]
    pub fn new(capture_id: impl Into<String>, sample_rate: f64) -> Self {
        Self { capture_id: capture_id.into(), sample_rate, extras: BTreeMap::new() }
    }

    /// Metadata with a fresh capture id. Generate once per process and keep it across rotations.
    #[must_use]
    pub fn generate(sample_rate: f64) -> Self {
        Self::new(hb_kernel::capture_id(), sample_rate)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn capture_id(&self) -> &str {
        &self.capture_id
    }

    #[must_use]
    pub const fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        self.get(keys::NODE_ID)
    }

    #[must_use]
    pub const fn extras(&self) -> &BTreeMap<String, String> {
        &self.extras
    }

    /// Reads a header produced by [`fmt::Display`] back.
    ///
    /// Text before the begin marker and lines that are not `# KEY\tVALUE` pairs are skipped;
    /// reading stops at the end marker.
    ///
    /// # Errors
    /// Returns [`CaptureError::Metadata`] if `CAPTURE_ID` or `SAMPLE_RATE` is absent or
    /// the sample rate is not a number.
    pub fn parse(text: &str) -> Result<Self, CaptureError> {
        let mut capture_id = None;
        let mut sample_rate = None;
        let mut extras = BTreeMap::new();

        let body = text
            .lines()
            .map(str::trim_end)
            .skip_while(|line| *line != keys::BEGIN)
            .skip(1)
            .take_while(|line| *line != keys::END);

        for line in body {
            let Some((key, value)) = line.strip_prefix("# ").and_then(|kv| kv.split_once('\t'))
            else {
                continue;
            };
            let value = value.trim_start_matches('\t');

            match key {
                keys::CAPTURE_ID => capture_id = Some(value.to_owned()),
                keys::SAMPLE_RATE => {
                    sample_rate = Some(value.parse::<f64>().map_err(|e| CaptureError::Metadata {
                        message: format!("{} is not a number: {e}", keys::SAMPLE_RATE).into(),
                        context: Some(value.to_owned().into()),
                    })?);
                },
                _ => {
                    extras.insert(key.to_owned(), value.to_owned());
                },
            }
        }

        let capture_id = capture_id.ok_or_else(|| missing(keys::CAPTURE_ID))?;
        let sample_rate = sample_rate.ok_or_else(|| missing(keys::SAMPLE_RATE))?;

        Ok(Self { capture_id, sample_rate, extras })
    }
}

fn missing(key: &'static str) -> CaptureError {
    CaptureError::Metadata { message: format!("{key} not found in header").into(), context: None }
}

impl fmt::Display for CaptureMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", keys::BEGIN)?;
        writeln!(f, "# {}\t\t{}", keys::CAPTURE_ID, self.capture_id)?;
        writeln!(f, "# {}\t\t{}", keys::SAMPLE_RATE, self.sample_rate)?;
        for (key, value) in &self.extras {
            writeln!(f, "# {key}\t\t{value}")?;
        }
        writeln!(f, "{}", keys::END)
    }
}
