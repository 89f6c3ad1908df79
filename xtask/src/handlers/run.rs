use crate::services::utils::get_project_root;
use anyhow::{Context, bail};
use hb_domain::constants::BINARY_NAME;
use std::path::Path;

/// Runs the acquisition node with `cargo run`, using `apps/acquisition/config.toml`
/// unless another file is given.
///
/// # Errors
/// Returns an error if the node fails to build or exits with a non-zero status.
pub fn run_node(config: Option<&Path>) -> anyhow::Result<()> {
    let root = get_project_root()?;
    let config = config.map_or_else(|| root.join("apps/acquisition/config.toml"), Path::to_path_buf);

    println!("🚀 Starting {BINARY_NAME} with {}...", config.display());

    let status = std::process::Command::new("cargo")
        .args(["run", "-p", BINARY_NAME, "--"])
        .arg(&config)
        .current_dir(&root)
        .status()
        .context("Failed to execute cargo run")?;

    if !status.success() {
        bail!("Node exited with non-zero status: {}", status.code().unwrap_or(-1));
    }

    Ok(())
}
