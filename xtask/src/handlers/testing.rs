use crate::services::utils::{get_project_root, normalize_project_name, workspace_packages};

fn package_args(project: Option<&str>) -> anyhow::Result<Vec<String>> {
    match project {
        None | Some("all") => Ok(vec!["--workspace".into()]),
        Some(project) => {
            let packages = workspace_packages(&get_project_root()?)?;
            Ok(vec!["-p".into(), normalize_project_name(project, &packages)?])
        },
    }
}

/// Runs tests in the workspace or a specific crate.
///
/// # Errors
/// Returns an error if the crate is unknown or the test run fails.
pub fn run_tests(project: Option<&str>) -> anyhow::Result<()> {
    let target_label = if matches!(project, None | Some("all")) { "workspace" } else { "crate" };

    println!("🧪 Running {target_label} tests...");
    let has_nextest = std::process::Command::new("cargo-nextest").arg("--version").output().is_ok();

    let mut args: Vec<String> = if has_nextest {
        vec!["nextest".into(), "run".into()]
    } else {
        vec!["test".into()]
    };
    args.extend(package_args(project)?);

    if has_nextest {
        args.extend(
            ["--failure-output", "immediate-final", "--success-output", "never", "--status-level", "skip"]
                .into_iter()
                .map(String::from),
        );
    } else {
        args.extend(["--tests", "--lib", "--bins", "--", "-q"].into_iter().map(String::from));
    }

    println!("🧪 Running tests via '{}'...", if has_nextest { "nextest" } else { "cargo test" });
    let status = std::process::Command::new("cargo").args(args).status()?;

    if !status.success() {
        anyhow::bail!("Tests failed!");
    }
    Ok(())
}

/// Runs doc tests in the workspace or a specific crate.
///
/// # Errors
/// Returns an error if the crate is unknown or the doctest run fails.
pub fn run_doctests(project: Option<&str>) -> anyhow::Result<()> {
    println!("📚 Running doc tests via 'cargo test --doc'...");

    let mut args: Vec<String> = vec!["test".into(), "--doc".into()];
    args.extend(package_args(project)?);

    let status = std::process::Command::new("cargo").args(args).status()?;

    if !status.success() {
        anyhow::bail!("Doc tests failed!");
    }

    Ok(())
}
