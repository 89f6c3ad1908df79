use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::Path;

fn xtask() -> Command {
    cargo_bin_cmd!("xtask")
}

fn repo_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap()
}

#[test]
fn release_tags_pass_the_gate() {
    xtask()
        .args(["release", "tag", "refs/tags/v1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v1.4.0 is a release tag"));
}

#[test]
fn other_refs_fail_the_gate() {
    for reference in ["v1.4.0-rc.1", "refs/heads/main", "1.4.0"] {
        xtask()
            .args(["release", "tag", reference])
            .assert()
            .failure()
            .stderr(predicate::str::contains("is not a release tag"));
    }
}

#[test]
fn env_prints_scoped_dockerfile_lines() {
    xtask()
        .args(["release", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ENV CARGO_TARGET_ARMV7_UNKNOWN_LINUX_GNUEABIHF_LINKER=\"arm-linux-gnueabihf-gcc\"",
        ))
        .stdout(predicate::str::contains("ENV CC=").not());
}

#[test]
fn shipped_dockerfile_verifies() {
    xtask()
        .current_dir(repo_root())
        .args(["release", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is consistent with armv7-unknown-linux-gnueabihf"));
}

#[test]
fn unscoped_dockerfile_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dockerfile = dir.path().join("Dockerfile");
    std::fs::write(
        &dockerfile,
        "FROM rust:1-bookworm\n\
         RUN apt-get update && apt-get install -y gcc-arm-linux-gnueabihf\n\
         RUN dpkg --add-architecture armhf\n\
         ENV CC=arm-linux-gnueabihf-gcc\n\
         ENTRYPOINT [\"cargo\"]\n",
    )
    .unwrap();

    xtask()
        .args(["release", "verify", "--dockerfile"])
        .arg(&dockerfile)
        .assert()
        .failure()
        .stdout(predicate::str::contains("CC is not scoped to the target triple"))
        .stdout(predicate::str::contains("runs after the first apt-get install"))
        .stdout(predicate::str::contains("package libudev-dev:armhf is not installed"));
}

#[test]
fn package_writes_a_single_entry_archive() {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("heartbeat-acquisition");
    std::fs::write(&binary, b"\x7fELF").unwrap();
    let out = dir.path().join("dist");

    xtask()
        .args(["release", "package", "--binary"])
        .arg(&binary)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("heartbeat-acquisition-rpi.tar.gz"));

    let archive = out.join("heartbeat-acquisition-rpi.tar.gz");
    assert!(archive.is_file());

    xtask()
        .current_dir(repo_root())
        .args(["release", "verify", "--archive"])
        .arg(&archive)
        .assert()
        .success();
}

#[test]
fn package_fails_for_missing_binary() {
    let dir = tempfile::tempdir().unwrap();
    xtask()
        .args(["release", "package", "--binary", "does-not-exist", "--out"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read binary"));
}

#[test]
fn image_cmd_must_match_the_release_build() {
    let shipped = std::fs::read_to_string(repo_root().join("ops/docker/rpi/Dockerfile")).unwrap();
    let without_features = shipped.replace(", \"--features\", \"rpi\"]", "]");
    assert_ne!(shipped, without_features);

    let dir = tempfile::tempdir().unwrap();
    let dockerfile = dir.path().join("Dockerfile");
    std::fs::write(&dockerfile, without_features).unwrap();

    xtask()
        .current_dir(repo_root())
        .args(["release", "verify", "--dockerfile"])
        .arg(&dockerfile)
        .assert()
        .failure()
        .stdout(predicate::str::contains("CMD must be"))
        .stdout(predicate::str::contains("\"--features\", \"rpi\""));
}

#[test]
fn cross_config_installs_the_target_libraries() {
    let config = std::fs::read_to_string(repo_root().join("Cross.toml")).unwrap();
    assert!(config.contains("[target.armv7-unknown-linux-gnueabihf]"));
    assert!(config.contains("libudev-dev:armhf"));
}

#[test]
fn cross_config_without_target_libraries_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cross = dir.path().join("Cross.toml");
    std::fs::write(
        &cross,
        "[target.armv7-unknown-linux-gnueabihf]\npre-build = [\"apt-get install -y libssl-dev:armhf\"]\n",
    )
    .unwrap();

    xtask()
        .current_dir(repo_root())
        .args(["release", "verify", "--cross-config"])
        .arg(&cross)
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not install libudev-dev:armhf"))
        .stdout(predicate::str::contains("CMD must be").not());
}

#[test]
fn release_workflow_must_hand_off_the_arm_build_artifact() {
    let shipped =
        std::fs::read_to_string(repo_root().join(".github/workflows/release.yml")).unwrap();
    let renamed = shipped.replace("name: arm-build", "name: binary");
    assert_ne!(shipped, renamed);

    let dir = tempfile::tempdir().unwrap();
    let workflow = dir.path().join("release.yml");
    std::fs::write(&workflow, renamed).unwrap();

    xtask()
        .current_dir(repo_root())
        .args(["release", "verify", "--workflow"])
        .arg(&workflow)
        .assert()
        .failure()
        .stdout(predicate::str::contains("artifact 'binary' should be 'arm-build'"))
        .stdout(predicate::str::contains("CMD must be").not());
}
