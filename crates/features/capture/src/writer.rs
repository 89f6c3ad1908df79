use crate::error::{CaptureError, CaptureErrorExt};
use crate::metadata::CaptureMetadata;
use chrono::{DateTime, Utc};
use hb_domain::constants::{CAPTURE_VERSION, metadata as keys};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const UNKNOWN_NODE: &str = "UNKNOWN";
const SHORT_ID_LEN: usize = 8;

/// A single capture file: metadata header followed by timestamped raw lines.
#[derive(Debug)]
pub struct CaptureWriter {
    path: PathBuf,
    created: DateTime<Utc>,
    metadata: CaptureMetadata,
    file: BufWriter<File>,
    lines_written: u64,
}

impl CaptureWriter {
    /// Creates a new capture file in `dir` and writes its header.
    ///
    /// Stamps `CREATED` and `VERSION` into `metadata` so the caller keeps them for the
    /// next rotation. The file is named `<NODE_ID>_<YYYYmmdd_HHMMSS>_<id prefix>.csv`;
    /// a `-<n>` suffix is added when that name is already taken.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the directory or file cannot be created or written.
    pub fn create(dir: &Path, metadata: &mut CaptureMetadata) -> Result<Self, CaptureError> {
        let created = Utc::now();
        metadata.set(keys::CREATED, created.to_rfc3339());
        metadata.set(keys::VERSION, CAPTURE_VERSION.to_string());

        fs::create_dir_all(dir)
            .context(format!("Failed to create data directory {}", dir.display()))?;

        let stem = format!(
            "{}_{}_{}",
            metadata.node_id().unwrap_or(UNKNOWN_NODE),
            created.format("%Y%m%d_%H%M%S"),
            metadata.capture_id().chars().take(SHORT_ID_LEN).collect::<String>()
        );
        let (path, file) = create_unique(dir, &stem)?;

        let mut writer = Self {
            path,
            created,
            metadata: metadata.clone(),
            file: BufWriter::new(file),
            lines_written: 0,
        };
        let header = writer.metadata.to_string();
        writer.write_raw(&header)?;

        info!(path = %writer.path.display(), "Created capture file");
        Ok(writer)
    }

    /// Appends `line` prefixed with the host's wall-clock time (`<epoch secs>,`) and flushes.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the write fails.
    pub fn write_line(&mut self, line: &str) -> Result<(), CaptureError> {
        let mut record = format!("{},{line}", epoch_seconds());
        if !record.ends_with('\n') {
            record.push('\n');
        }
        self.write_raw(&record)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Writes `# <text>` as a timestamped line.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the write fails.
    pub fn comment(&mut self, text: &str) -> Result<(), CaptureError> {
        self.write_line(&format!("# {text}"))
    }

    /// # Errors
    /// Returns [`CaptureError::Io`] if buffered data cannot be written out.
    pub fn flush(&mut self) -> Result<(), CaptureError> {
        self.file.flush().context("Failed to flush capture file")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    #[must_use]
    pub const fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn write_raw(&mut self, text: &str) -> Result<(), CaptureError> {
        self.file.write_all(text.as_bytes()).context("Failed to write capture file")?;
        self.flush()
    }
}

/// Host wall-clock time as fractional seconds since the Unix epoch.
#[must_use]
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File), CaptureError> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 { format!("{stem}.csv") } else { format!("{stem}-{attempt}.csv") };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Capture file name taken");
                attempt += 1;
            },
            Err(e) => {
                return Err(e).context(format!("Failed to create {}", path.display()));
            },
        }
    }
}

/// Owns the current [`CaptureWriter`] and starts a new file every `rotate_every` lines.
#[derive(Debug)]
pub struct RotatingCapture {
    dir: PathBuf,
    metadata: CaptureMetadata,
    rotate_every: u64,
    writer: CaptureWriter,
    rotations: u64,
}

impl RotatingCapture {
    /// Opens the first capture file.
    ///
    /// # Errors
    /// * [`CaptureError::Config`] if `rotate_every` is zero.
    /// * [`CaptureError::Io`] if the first file cannot be created.
    pub fn open(
        dir: impl Into<PathBuf>,
        mut metadata: CaptureMetadata,
        rotate_every: u64,
    ) -> Result<Self, CaptureError> {
        if rotate_every == 0 {
            return Err(CaptureError::Config {
                message: "rotate_every must be greater than zero".into(),
                context: None,
            });
        }

        let dir = dir.into();
        let writer = CaptureWriter::create(&dir, &mut metadata)?;
        Ok(Self { dir, metadata, rotate_every, writer, rotations: 0 })
    }

    /// Writes a data line and rotates once the current file is full.
    ///
    /// Returns `true` when a new file was started.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the write or the rotation fails.
    pub fn write_line(&mut self, line: &str) -> Result<bool, CaptureError> {
        self.writer.write_line(line)?;
        if self.writer.lines_written() < self.rotate_every {
            return Ok(false);
        }
        self.rotate()?;
        Ok(true)
    }

    /// Writes a line without considering rotation, so a follow-up comment lands in the same file.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the write fails.
    pub fn write_unrotated(&mut self, line: &str) -> Result<(), CaptureError> {
        self.writer.write_line(line)
    }

    /// Comments count towards the file size but never trigger a rotation on their own.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the write fails.
    pub fn comment(&mut self, text: &str) -> Result<(), CaptureError> {
        self.writer.comment(text)
    }

    /// Closes the current file and starts the next one with the same capture id.
    ///
    /// # Errors
    /// Returns [`CaptureError::Io`] if the new file cannot be created.
    pub fn rotate(&mut self) -> Result<(), CaptureError> {
        self.writer.flush()?;
        let next = CaptureWriter::create(&self.dir, &mut self.metadata)?;
        let previous = std::mem::replace(&mut self.writer, next);
        self.rotations += 1;
        info!(
            closed = %previous.path().display(),
            lines = previous.lines_written(),
            rotations = self.rotations,
            "Rotated capture file"
        );
        Ok(())
    }

    /// # Errors
    /// Returns [`CaptureError::Io`] if buffered data cannot be written out.
    pub fn flush(&mut self) -> Result<(), CaptureError> {
        self.writer.flush()
    }

    #[must_use]
    pub const fn writer(&self) -> &CaptureWriter {
        &self.writer
    }

    #[must_use]
    pub const fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn rotations(&self) -> u64 {
        self.rotations
    }
}
