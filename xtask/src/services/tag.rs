use anyhow::{Context, Result, bail};
use std::fmt;
use std::str::FromStr;

const TAG_REF_PREFIX: &str = "refs/tags/";

/// A release tag of the form `vMAJOR.MINOR.PATCH`.
///
/// This is the same gate as the release workflow's `v[0-9]+.[0-9]+.[0-9]+` trigger:
/// pre-release suffixes, build metadata and branch refs are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseTag {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ReleaseTag {
    /// Parses a tag name or a full `refs/tags/...` ref.
    ///
    /// # Errors
    /// Returns an error if the reference is not exactly `vMAJOR.MINOR.PATCH`.
    pub fn parse(reference: &str) -> Result<Self> {
        let name = reference.strip_prefix(TAG_REF_PREFIX).unwrap_or(reference);
        let Some(version) = name.strip_prefix('v') else {
            bail!("'{reference}' is not a release tag: expected 'vMAJOR.MINOR.PATCH'");
        };

        let mut parts = version.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            bail!("'{reference}' is not a release tag: expected three version components");
        };

        Ok(Self {
            major: component(reference, "major", major)?,
            minor: component(reference, "minor", minor)?,
            patch: component(reference, "patch", patch)?,
        })
    }
}

fn component(reference: &str, label: &str, raw: &str) -> Result<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("'{reference}' is not a release tag: {label} version '{raw}' must be digits only");
    }
    raw.parse().with_context(|| format!("'{reference}': {label} version '{raw}' is too large"))
}

impl FromStr for ReleaseTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}
