use crate::models::args::BuildStrategy;
use crate::services::archive;
use crate::services::cross::{self, CrossConfig};
use crate::services::docker::BuilderImage;
use crate::services::dockerfile::{ArchitectureOrder, Dockerfile};
use crate::services::tag::ReleaseTag;
use crate::services::target::{CrossEnv, TargetTriple, Toolchain};
use crate::services::utils::{get_project_root, release_binary_path, release_build_args};
use crate::services::workflow;
use anyhow::{Context, Result, bail};
use hb_domain::constants::{ARTIFACT_NAME, BINARY_NAME, TARGET_TRIPLE};
use std::path::Path;

/// Accepts `vMAJOR.MINOR.PATCH` tags (optionally as `refs/tags/...`) and nothing else.
///
/// # Errors
/// Returns an error if the reference is not a release tag.
pub fn check_tag(reference: &str) -> Result<()> {
    let tag = ReleaseTag::parse(reference)?;
    println!("✅ {tag} is a release tag.");
    Ok(())
}

fn cross_env(target: &str) -> Result<CrossEnv> {
    let target = TargetTriple::parse(target)?;
    let toolchain = Toolchain::for_target(&target)?;
    Ok(CrossEnv::for_target(&target, &toolchain))
}

/// Prints the cross environment for `target` as Dockerfile `ENV` lines.
///
/// # Errors
/// Returns an error for a malformed or unsupported target.
pub fn print_env(target: &str) -> Result<()> {
    print!("{}", cross_env(target)?.render_dockerfile_env());
    Ok(())
}

/// Files `release verify` checks against each other.
#[derive(Debug, Clone, Copy)]
pub struct VerifyInputs<'a> {
    pub dockerfile: &'a Path,
    pub cross_config: &'a Path,
    pub workflow: &'a Path,
    pub archive: Option<&'a Path>,
}

/// Checks the build image definition, the `cross` config, the release workflow's
/// artifact hand-off and, when given, a release archive.
///
/// Every problem is printed before failing, so one run shows all of them.
///
/// # Errors
/// Returns an error if the Dockerfile cannot be read or any check fails.
pub fn verify(inputs: VerifyInputs<'_>, target: &str) -> Result<()> {
    let VerifyInputs { dockerfile: dockerfile_path, cross_config, workflow: workflow_path, archive } =
        inputs;
    let env = cross_env(target)?;
    let toolchain = Toolchain::for_target(env.target())?;
    let dockerfile = Dockerfile::read(dockerfile_path)?;
    let mut problems = Vec::new();

    let vars = dockerfile.env();
    problems.extend(
        env.validate(vars.iter().map(|(name, value)| (name.as_str(), value.as_str())))
            .iter()
            .map(ToString::to_string),
    );

    match dockerfile.architecture_order() {
        ArchitectureOrder::BeforeInstall => {},
        ArchitectureOrder::AfterInstall { added, installed } => problems.push(format!(
            "dpkg --add-architecture (line {added}) runs after the first apt-get install (line {installed})"
        )),
        ArchitectureOrder::Missing => {
            problems.push(format!("dpkg --add-architecture {} is missing", toolchain.dpkg_arch));
        },
    }

    let packages = dockerfile.apt_packages();
    problems.extend(
        toolchain
            .required_packages()
            .into_iter()
            .filter(|package| !packages.contains(package))
            .map(|package| format!("package {package} is not installed")),
    );

    if dockerfile.entrypoint().as_deref() != Some(&["cargo".to_owned()][..]) {
        problems.push("ENTRYPOINT must be [\"cargo\"]".to_owned());
    }

    // CI runs the image without arguments, `xtask release build` passes its own.
    let build_args = release_build_args(target);
    if dockerfile.cmd().as_deref() != Some(build_args.as_slice()) {
        problems.push(format!("CMD must be {build_args:?}, the arguments of `xtask release build`"));
    }

    match CrossConfig::read(cross_config)
        .and_then(|config| config.missing_packages(target, &toolchain.target_packages()))
    {
        Ok(missing) => problems.extend(
            missing
                .into_iter()
                .map(|package| format!("{} does not install {package}", cross_config.display())),
        ),
        Err(e) => problems.push(format!("{e:#}")),
    }

    match workflow::read_artifact_steps(workflow_path) {
        Ok(steps) => problems.extend(
            workflow::artifact_problems(&steps, ARTIFACT_NAME)
                .into_iter()
                .map(|problem| format!("{}: {problem}", workflow_path.display())),
        ),
        Err(e) => problems.push(format!("{e:#}")),
    }

    if let Some(archive_path) = archive
        && let Err(e) = archive::ensure_single_entry(archive_path, BINARY_NAME)
    {
        problems.push(e.to_string());
    }

    if !problems.is_empty() {
        for problem in &problems {
            println!("❌ {problem}");
        }
        bail!("{} problem(s) found in {}", problems.len(), dockerfile_path.display());
    }

    println!("✅ {} is consistent with {target}.", dockerfile_path.display());
    Ok(())
}

/// Cross-compiles the acquisition binary for the Raspberry Pi.
///
/// # Errors
/// Returns an error if the build fails or does not leave the binary where expected.
pub fn build(strategy: BuildStrategy) -> Result<()> {
    let root = get_project_root()?;
    let args = release_build_args(TARGET_TRIPLE);

    match strategy {
        BuildStrategy::Container => {
            let image = BuilderImage::new();
            image.build(&root)?;
            image.run(&root, &args)?;
        },
        BuildStrategy::Cross => {
            cross::ensure_installed()?;
            cross::run(&root, &args)?;
        },
    }

    let binary = release_binary_path(&root, TARGET_TRIPLE);
    if !binary.is_file() {
        bail!("Build finished but {} does not exist", binary.display());
    }
    println!("✨ Built {}", binary.display());
    Ok(())
}

/// Packs a built binary into the release tarball.
///
/// # Errors
/// Returns an error if the archive cannot be written or does not verify.
pub fn package(binary: &Path, out: &Path) -> Result<()> {
    let archive = archive::package(binary, out)?;
    let name = binary.file_name().and_then(|name| name.to_str()).context("Invalid binary name")?;
    archive::ensure_single_entry(&archive, name)?;
    println!("📦 Wrote {}", archive.display());
    Ok(())
}
