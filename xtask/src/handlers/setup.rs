use crate::services::cross;
use crate::services::utils::run_command;
use anyhow::{Context, Result};
use hb_domain::constants::TARGET_TRIPLE;
use std::process::Command;

/// Installs the Raspberry Pi target and the `cross` helper.
///
/// The container build needs neither, only Docker; this prepares a host for
/// `cargo xtask release build --strategy cross`.
///
/// # Errors
/// Returns an error if rustup or cargo fail.
pub fn setup_project() -> Result<()> {
    println!("🛠️  Starting Heartbeat development setup...");

    let installed = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
        .context("Failed to list installed rustup targets")?;

    if String::from_utf8_lossy(&installed.stdout).lines().any(|line| line.trim() == TARGET_TRIPLE) {
        println!("✅ Target {TARGET_TRIPLE} is already installed.");
    } else {
        println!("🦀 Adding rustup target: {TARGET_TRIPLE}...");
        run_command("rustup", &["target", "add", TARGET_TRIPLE])?;
    }

    cross::ensure_installed()?;

    println!("\n✨ Setup complete! Run 'cargo xtask release build' to cross-compile.");
    Ok(())
}
