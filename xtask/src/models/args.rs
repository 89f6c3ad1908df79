//! # CLI Argument Definitions
//!
//! This module defines the command-line interface (CLI) structure using the `clap` crate.
//! It specifies the available subcommands, arguments, and flags for the release tooling.

use clap::{Parser, Subcommand, ValueEnum};
use hb_domain::constants::TARGET_TRIPLE;
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "cargo xtask")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Developer and release toolkit for the Heartbeat workspace")]
pub struct Cli {
    /// The main subcommand to execute.
    #[command(subcommand)]
    pub command: AppCommands,
}

/// Enumeration of available application subcommands.
#[derive(Debug, Subcommand)]
pub enum AppCommands {
    /// Install the Raspberry Pi target and the `cross` helper
    Setup {},
    /// Cross-compile, check and package release artifacts
    Release {
        #[command(subcommand)]
        action: ReleaseAction,
    },
    /// Run tests (workspace by default)
    Test {
        /// Run tests for a specific crate (auto-prefixes with 'hb-' if missing)
        project: Option<String>,
    },
    /// Run doc tests (workspace by default)
    Doctest {
        /// Run doc tests for a specific crate (auto-prefixes with 'hb-' if missing)
        project: Option<String>,
    },
    /// Run the acquisition node on this machine
    Run {
        /// Configuration file passed to the node
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReleaseAction {
    /// Exit non-zero unless the ref is a `vMAJOR.MINOR.PATCH` tag
    Tag {
        /// Tag name or full ref, e.g. 'v1.2.3' or 'refs/tags/v1.2.3'
        reference: String,
    },
    /// Print the cross-compilation environment as Dockerfile `ENV` lines
    Env {
        #[arg(short, long, default_value = TARGET_TRIPLE)]
        target: String,
    },
    /// Check the build image, `cross` config and release workflow (and optionally an archive)
    Verify {
        #[arg(short, long, default_value = "ops/docker/rpi/Dockerfile")]
        dockerfile: PathBuf,

        /// Config of the `cross` helper build
        #[arg(short, long, default_value = "Cross.toml")]
        cross_config: PathBuf,

        /// Workflow that hands the binary from the build job to the publish job
        #[arg(short, long, default_value = ".github/workflows/release.yml")]
        workflow: PathBuf,

        #[arg(short, long, default_value = TARGET_TRIPLE)]
        target: String,

        /// Release archive expected to hold exactly the acquisition binary
        #[arg(short, long)]
        archive: Option<PathBuf>,
    },
    /// Cross-compile the acquisition binary for the Raspberry Pi
    Build {
        #[arg(short, long, value_enum, default_value_t = BuildStrategy::Container)]
        strategy: BuildStrategy,
    },
    /// Pack a built binary into `<binary>-rpi.tar.gz`
    Package {
        /// Path to the compiled binary
        #[arg(short, long)]
        binary: PathBuf,

        /// Directory the archive is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

/// How the cross-build environment is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildStrategy {
    /// Build and run the image from `ops/docker/rpi` (used by CI)
    Container,
    /// Use the `cross` helper installed on the host
    Cross,
}
