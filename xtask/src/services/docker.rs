use anyhow::{Context, Result};
use hb_domain::constants::{BUILDER_IMAGE, CONTAINER_WORKDIR};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// The cross-compilation image defined in `ops/docker/rpi`.
///
/// Its entrypoint is `cargo`, so whatever follows the image name in `docker run` is a
/// cargo command executed against the project mounted at `/project`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderImage {
    tag: String,
    dockerfile: PathBuf,
    context: PathBuf,
}

impl Default for BuilderImage {
    fn default() -> Self {
        Self {
            tag: BUILDER_IMAGE.to_owned(),
            dockerfile: PathBuf::from("ops/docker/rpi/Dockerfile"),
            context: PathBuf::from("ops/docker/rpi"),
        }
    }
}

impl BuilderImage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the Dockerfile location (useful for testing/custom setups).
    #[must_use]
    pub fn with_dockerfile(dockerfile: impl Into<PathBuf>, context: impl Into<PathBuf>) -> Self {
        Self { dockerfile: dockerfile.into(), context: context.into(), ..Self::default() }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn dockerfile(&self) -> &Path {
        &self.dockerfile
    }

    /// Arguments of `docker build`, relative to `root`.
    #[must_use]
    pub fn build_args(&self, root: &Path) -> Vec<String> {
        vec![
            "build".to_owned(),
            "-t".to_owned(),
            self.tag.clone(),
            "-f".to_owned(),
            root.join(&self.dockerfile).display().to_string(),
            root.join(&self.context).display().to_string(),
        ]
    }

    /// Arguments of `docker run` executing `cargo <cargo_args>` on `root`.
    #[must_use]
    pub fn run_args(&self, root: &Path, cargo_args: &[String]) -> Vec<String> {
        let mut args = vec![
            "run".to_owned(),
            "--rm".to_owned(),
            "-v".to_owned(),
            format!("{}:{CONTAINER_WORKDIR}", root.display()),
            "-w".to_owned(),
            CONTAINER_WORKDIR.to_owned(),
            self.tag.clone(),
        ];
        args.extend(cargo_args.iter().cloned());
        args
    }

    /// Builds the image.
    ///
    /// # Errors
    /// Returns an error if the Dockerfile is missing or `docker build` fails.
    pub fn build(&self, root: &Path) -> Result<()> {
        let dockerfile = root.join(&self.dockerfile);
        if !dockerfile.exists() {
            anyhow::bail!("Dockerfile not found at: {}", dockerfile.display());
        }

        println!("🐳 Building image {}...", self.tag);
        docker(&self.build_args(root))
    }

    /// Runs `cargo <cargo_args>` inside the image with `root` mounted read-write.
    ///
    /// # Errors
    /// Returns an error if `docker run` fails.
    pub fn run(&self, root: &Path, cargo_args: &[String]) -> Result<()> {
        println!("🐳 Running 'cargo {}' in {}...", cargo_args.join(" "), self.tag);
        docker(&self.run_args(root, cargo_args))
    }
}

fn docker(args: &[String]) -> Result<()> {
    let status = Command::new("docker")
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| "Failed to execute docker command. Is Docker installed and in your PATH?")?;

    if !status.success() {
        anyhow::bail!("Docker command failed with status: {status}");
    }

    Ok(())
}
