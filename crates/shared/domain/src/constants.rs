//! Names that have to agree between the binary, the build image, the release
//! workflow and the packaging code.

/// The single cross-compilation target of the release pipeline.
pub const TARGET_TRIPLE: &str = "armv7-unknown-linux-gnueabihf";

/// Name of the released executable (the `heartbeat-acquisition` package's binary).
pub const BINARY_NAME: &str = "heartbeat-acquisition";

/// Name of the workflow artifact handed from the build job to the publish job.
pub const ARTIFACT_NAME: &str = "arm-build";

/// Suffix appended to the binary name for the release tarball.
pub const ARCHIVE_SUFFIX: &str = "-rpi.tar.gz";

/// Tag of the cross-compilation image built from `ops/docker/rpi`.
pub const BUILDER_IMAGE: &str = "heartbeat-rpi-builder";

/// Mount point of the project inside the build image.
pub const CONTAINER_WORKDIR: &str = "/project";

/// Prefix marking a data line coming from the acquisition MCU.
pub const FRAME_PREFIX: char = '$';

/// Capture file format version written into every header.
pub const CAPTURE_VERSION: u32 = 3;

/// Length of the per-process capture id.
pub const CAPTURE_ID_LEN: usize = 16;

/// Metadata keys of the capture file header.
pub mod metadata {
    pub const CAPTURE_ID: &str = "CAPTURE_ID";
    pub const SAMPLE_RATE: &str = "SAMPLE_RATE";
    pub const CREATED: &str = "CREATED";
    pub const VERSION: &str = "VERSION";
    pub const NODE_ID: &str = "NODE_ID";
    pub const BEGIN: &str = "## BEGIN METADATA ##";
    pub const END: &str = "## END METADATA ##";
}

/// File name of the release tarball, e.g. `heartbeat-acquisition-rpi.tar.gz`.
#[must_use]
pub fn archive_name(binary: &str) -> String {
    format!("{binary}{ARCHIVE_SUFFIX}")
}
