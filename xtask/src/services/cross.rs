use crate::services::utils::is_tool_installed;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

/// The parts of `Cross.toml` the release build relies on.
#[derive(Debug, Default, Deserialize)]
pub struct CrossConfig {
    #[serde(default)]
    target: BTreeMap<String, CrossTarget>,
}

#[derive(Debug, Default, Deserialize)]
struct CrossTarget {
    #[serde(default, rename = "pre-build")]
    pre_build: Vec<String>,
}

impl CrossConfig {
    /// # Errors
    /// Returns an error if the file is missing or is not valid `Cross.toml`.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read cross config at {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// # Errors
    /// Returns an error if `text` is not valid `Cross.toml`.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `packages` that no `pre-build` command of `target` installs.
    ///
    /// # Errors
    /// Returns an error if the config has no `[target.<target>]` section.
    pub fn missing_packages(&self, target: &str, packages: &[String]) -> Result<Vec<String>> {
        let section = self
            .target
            .get(target)
            .with_context(|| format!("Cross config has no [target.{target}] section"))?;
        let installed: Vec<&str> = section
            .pre_build
            .iter()
            .filter(|command| command.contains("apt-get install") || command.contains("apt install"))
            .flat_map(|command| command.split_whitespace())
            .collect();

        Ok(packages.iter().filter(|package| !installed.contains(&package.as_str())).cloned().collect())
    }
}

/// Installs `cross` through cargo unless it is already on the PATH.
///
/// # Errors
/// Returns an error if `cargo install cross` fails.
pub fn ensure_installed() -> Result<()> {
    if is_tool_installed("cross") {
        println!("✅ cross is already installed.");
        return Ok(());
    }

    println!("📥 Installing cross...");
    let status = Command::new("cargo")
        .args(["install", "cross", "--locked"])
        .status()
        .context("Failed to execute cargo install")?;

    if !status.success() {
        bail!("Installing cross failed with status {status}");
    }
    Ok(())
}

/// Runs `cross <cargo_args>` in `root`. `cross` brings its own toolchain image.
///
/// # Errors
/// Returns an error if `cross` cannot be started or the build fails.
pub fn run(root: &Path, cargo_args: &[String]) -> Result<()> {
    println!("🔧 Running 'cross {}'...", cargo_args.join(" "));
    let status = Command::new("cross")
        .args(cargo_args)
        .current_dir(root)
        .status()
        .context("Failed to execute cross. Run 'cargo xtask setup' first")?;

    if !status.success() {
        bail!("cross build failed with status {status}");
    }
    Ok(())
}
