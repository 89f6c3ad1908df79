use anyhow::{Context, Result, bail};
use hb_domain::constants::BINARY_NAME;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Workspace directories that hold member crates.
const MEMBER_DIRS: &[&str] = &["apps", "crates/features", "crates/shared", "infra"];

/// Members listed by path in the workspace manifest.
const MEMBER_CRATES: &[&str] = &["xtask"];

/// Cargo feature enabling the Raspberry Pi hardware support in the released binary.
pub const RELEASE_FEATURES: &str = "rpi";

/// Returns the root directory of the project.
///
/// # Errors
/// Returns an error if the manifest directory does not have a parent.
pub fn get_project_root() -> Result<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(Path::to_path_buf)
        .context("Could not find project root from xtask manifest")
}

#[derive(Debug, Deserialize)]
struct Manifest {
    package: PackageInfo,
}

#[derive(Debug, Deserialize)]
struct PackageInfo {
    name: String,
}

/// Package names of every workspace member under `root`.
///
/// # Errors
/// Returns an error if a member directory or manifest cannot be read or parsed.
pub fn workspace_packages(root: &Path) -> Result<Vec<String>> {
    let mut manifests: Vec<PathBuf> =
        MEMBER_CRATES.iter().map(|member| root.join(member).join("Cargo.toml")).collect();

    for dir in MEMBER_DIRS.iter().map(|dir| root.join(dir)).filter(|dir| dir.exists()) {
        for entry in fs::read_dir(&dir).with_context(|| format!("Failed to read {}", dir.display()))? {
            manifests.push(entry?.path().join("Cargo.toml"));
        }
    }

    let mut names = Vec::new();
    for manifest in manifests.iter().filter(|manifest| manifest.exists()) {
        let content = fs::read_to_string(manifest)?;
        let parsed: Manifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", manifest.display()))?;
        names.push(parsed.package.name);
    }

    names.sort();
    Ok(names)
}

/// Resolves a short crate name to a workspace package: `capture` → `hb-capture`,
/// `acquisition` → `heartbeat-acquisition`.
///
/// # Errors
/// Returns an error if no package matches.
pub fn normalize_project_name(project: &str, packages: &[String]) -> Result<String> {
    [project.to_owned(), format!("hb-{project}"), format!("heartbeat-{project}")]
        .into_iter()
        .find(|candidate| packages.contains(candidate))
        .with_context(|| format!("Unknown crate '{project}'. Known crates: {}", packages.join(", ")))
}

/// Cargo arguments of the release build, shared by both build strategies.
#[must_use]
pub fn release_build_args(target: &str) -> Vec<String> {
    ["build", "--release", "--target", target, "-p", BINARY_NAME, "--features", RELEASE_FEATURES]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Where a release build for `target` leaves the binary.
#[must_use]
pub fn release_binary_path(root: &Path, target: &str) -> PathBuf {
    root.join("target").join(target).join("release").join(BINARY_NAME)
}

#[must_use]
pub fn is_tool_installed(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Runs a command and fails on a non-zero exit.
///
/// # Errors
/// Returns an error if the command cannot start or exits unsuccessfully.
pub fn run_command(cmd: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(cmd)
        .args(args)
        .status()
        .with_context(|| format!("Failed to execute {cmd}"))?;

    if !status.success() {
        bail!("Command '{cmd} {args:?}' failed with status {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_names_resolve_with_prefixes() {
        let packages = vec!["heartbeat-acquisition".to_owned(), "hb-capture".to_owned(), "xtask".to_owned()];
        assert_eq!(normalize_project_name("capture", &packages).unwrap(), "hb-capture");
        assert_eq!(normalize_project_name("hb-capture", &packages).unwrap(), "hb-capture");
        assert_eq!(normalize_project_name("acquisition", &packages).unwrap(), "heartbeat-acquisition");
        assert!(normalize_project_name("vault", &packages).is_err());
    }

    #[test]
    fn workspace_members_are_discovered() {
        let root = get_project_root().unwrap();
        let packages = workspace_packages(&root).unwrap();
        assert!(packages.contains(&BINARY_NAME.to_owned()));
        assert!(packages.contains(&"hb-capture".to_owned()));
        assert!(packages.contains(&"xtask".to_owned()));
        assert!(packages.windows(2).all(|pair| pair[0] < pair[1]), "{packages:?}");
    }

    #[test]
    fn release_build_targets_the_acquisition_binary() {
        let args = release_build_args("armv7-unknown-linux-gnueabihf");
        assert_eq!(
            args,
            [
                "build",
                "--release",
                "--target",
                "armv7-unknown-linux-gnueabihf",
                "-p",
                "heartbeat-acquisition",
                "--features",
                "rpi"
            ]
        );
        assert!(
            release_binary_path(Path::new("/w"), "armv7-unknown-linux-gnueabihf")
                .ends_with("target/armv7-unknown-linux-gnueabihf/release/heartbeat-acquisition")
        );
    }
}
