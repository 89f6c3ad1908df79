//! Deterministic release archives.
//!
//! The tarball holds a single entry named like the binary. Every header field that
//! could vary between runs (timestamps, owners, gzip file name) is pinned, so the same
//! binary always yields the same bytes.

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use hb_domain::constants::archive_name;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const COMPRESSION_LEVEL: u32 = 9;
const BINARY_MODE: u32 = 0o755;

/// Packs `binary` into `<out_dir>/<binary name>-rpi.tar.gz` and returns the archive path.
///
/// # Errors
/// Returns an error if the binary cannot be read, has no UTF-8 file name, or the
/// archive cannot be written.
pub fn package(binary: &Path, out_dir: &Path) -> Result<PathBuf> {
    let name = binary
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", binary.display()))?;
    let data =
        fs::read(binary).with_context(|| format!("Failed to read binary {}", binary.display()))?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let path = out_dir.join(archive_name(name));
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

    let encoder = GzBuilder::new()
        .mtime(0)
        .write(BufWriter::new(file), Compression::new(COMPRESSION_LEVEL));
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(BINARY_MODE);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("").context("Failed to clear tar owner name")?;
    header.set_groupname("").context("Failed to clear tar group name")?;
    builder.append_data(&mut header, name, data.as_slice()).context("Failed to add binary")?;

    let mut writer = builder
        .into_inner()
        .context("Failed to finish tar stream")?
        .finish()
        .context("Failed to finish gzip stream")?;
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// Entry names in a `.tar.gz`, in archive order.
///
/// # Errors
/// Returns an error if the file is not a readable gzip-compressed tarball.
pub fn list_entries(archive: &Path) -> Result<Vec<String>> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut names = Vec::new();
    for entry in tarball.entries().context("Failed to read archive")? {
        let entry = entry.context("Corrupt archive entry")?;
        names.push(entry.path().context("Invalid entry path")?.to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Fails unless `archive` holds exactly one entry called `binary_name`.
///
/// # Errors
/// Returns an error if the archive cannot be read or its contents differ.
pub fn ensure_single_entry(archive: &Path, binary_name: &str) -> Result<()> {
    let entries = list_entries(archive)?;
    match entries.as_slice() {
        [only] if only == binary_name => Ok(()),
        _ => bail!(
            "{} must contain exactly one entry '{binary_name}', found {entries:?}",
            archive.display()
        ),
    }
}
