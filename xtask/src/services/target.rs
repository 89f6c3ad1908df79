//! Target triples and the environment that points a cross build at the right toolchain.
//!
//! Cargo and the `cc`, `cmake`, `pkg-config` and `bindgen` build helpers all accept
//! settings scoped to one target by suffixing the variable with the triple. Global
//! forms such as `CC` or `PKG_CONFIG_PATH` also apply to build scripts compiled for the
//! host, and a suffix that does not match the triple exactly is silently ignored. Both
//! mistakes leave the host compiler in charge, so [`CrossEnv::validate`] looks for them.

use anyhow::{Result, bail};
use std::fmt;
use std::str::FromStr;

/// Compiler flags for the Raspberry Pi 2/3/4 running a 32-bit hard-float userland.
const ARMV7_CFLAGS: &str =
    "-ffunction-sections -fdata-sections -fPIC -march=armv7-a -mfpu=vfpv3-d16 -mfloat-abi=hard";
const AARCH64_CFLAGS: &str = "-ffunction-sections -fdata-sections -fPIC -march=armv8-a";

/// Where the build image installs `toolchain.cmake`.
pub const CMAKE_TOOLCHAIN_PATH: &str = "/opt/heartbeat/toolchain.cmake";

/// Build helper knobs that also exist in a per-target form (`<KNOB>_<triple>`).
const SCOPED_KNOBS: &[&str] = &[
    "CC",
    "CXX",
    "AR",
    "CFLAGS",
    "CXXFLAGS",
    "PKG_CONFIG_PATH",
    "PKG_CONFIG_SYSROOT_DIR",
    "PKG_CONFIG_ALLOW_CROSS",
    "CMAKE_TOOLCHAIN_FILE",
    "BINDGEN_EXTRA_CLANG_ARGS",
];

/// Global settings that would override or bypass the scoped ones.
const UNSCOPED_OVERRIDES: &[&str] = &[
    "TARGET_CC",
    "TARGET_CXX",
    "TARGET_AR",
    "TARGET_CFLAGS",
    "TARGET_CXXFLAGS",
    "PKG_CONFIG_LIBDIR",
    "CARGO_BUILD_TARGET",
];

/// A target triple, `arch-vendor-os[-abi]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetTriple {
    raw: String,
    arch: String,
    vendor: String,
    os: String,
    abi: Option<String>,
}

impl TargetTriple {
    /// # Errors
    /// Returns an error unless `raw` has three or four non-empty `-` separated parts made of
    /// lowercase ASCII letters, digits and underscores.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('-').collect();
        let valid = |part: &&str| {
            !part.is_empty()
                && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        };

        match parts.as_slice() {
            [arch, vendor, os, rest @ ..] if rest.len() <= 1 && parts.iter().all(valid) => {
                Ok(Self {
                    raw: raw.to_owned(),
                    arch: (*arch).to_owned(),
                    vendor: (*vendor).to_owned(),
                    os: (*os).to_owned(),
                    abi: rest.first().map(|abi| (*abi).to_owned()),
                })
            },
            _ => bail!("'{raw}' is not a target triple (expected arch-vendor-os[-abi])"),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    #[must_use]
    pub fn abi(&self) -> Option<&str> {
        self.abi.as_deref()
    }

    /// Suffix used by the `cc`, `cmake`, `pkg-config` and `bindgen` helpers:
    /// `armv7_unknown_linux_gnueabihf`.
    #[must_use]
    pub fn env_suffix(&self) -> String {
        self.raw.replace('-', "_")
    }

    /// Key used by Cargo's `CARGO_TARGET_<KEY>_*` variables: `ARMV7_UNKNOWN_LINUX_GNUEABIHF`.
    #[must_use]
    pub fn cargo_env_key(&self) -> String {
        self.env_suffix().to_ascii_uppercase()
    }
}

impl FromStr for TargetTriple {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The Debian cross toolchain serving one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// GNU tool prefix, e.g. `arm-linux-gnueabihf`.
    pub prefix: String,
    /// Debian architecture for `dpkg --add-architecture` and `:arch` packages.
    pub dpkg_arch: String,
    /// qemu user-mode binary used as Cargo's runner.
    pub qemu: String,
    pub cflags: String,
    pub cmake_toolchain_file: String,
}

impl Toolchain {
    /// # Errors
    /// Returns an error for targets without a known Debian cross toolchain.
    pub fn for_target(target: &TargetTriple) -> Result<Self> {
        let (prefix, dpkg_arch, qemu, cflags) = match target.as_str() {
            "armv7-unknown-linux-gnueabihf" => {
                ("arm-linux-gnueabihf", "armhf", "qemu-arm", ARMV7_CFLAGS)
            },
            "aarch64-unknown-linux-gnu" => {
                ("aarch64-linux-gnu", "arm64", "qemu-aarch64", AARCH64_CFLAGS)
            },
            other => bail!("No cross toolchain is known for '{other}'"),
        };

        Ok(Self {
            prefix: prefix.to_owned(),
            dpkg_arch: dpkg_arch.to_owned(),
            qemu: qemu.to_owned(),
            cflags: cflags.to_owned(),
            cmake_toolchain_file: CMAKE_TOOLCHAIN_PATH.to_owned(),
        })
    }

    /// Root of the cross libc and headers installed by `libc6-dev-<arch>-cross`.
    #[must_use]
    pub fn sysroot(&self) -> String {
        format!("/usr/{}", self.prefix)
    }

    #[must_use]
    pub fn tool(&self, name: &str) -> String {
        format!("{}-{name}", self.prefix)
    }

    /// Packages the image must install for this toolchain.
    #[must_use]
    pub fn required_packages(&self) -> Vec<String> {
        vec![
            format!("gcc-{}", self.prefix),
            format!("g++-{}", self.prefix),
            format!("libc6-dev-{}-cross", self.dpkg_arch),
            format!("libudev-dev:{}", self.dpkg_arch),
            format!("libssl-dev:{}", self.dpkg_arch),
            "pkg-config".to_owned(),
            "cmake".to_owned(),
            "qemu-user".to_owned(),
        ]
    }

    /// Required packages built for the target architecture (`name:arch`) rather than the host.
    #[must_use]
    pub fn target_packages(&self) -> Vec<String> {
        let suffix = format!(":{}", self.dpkg_arch);
        self.required_packages().into_iter().filter(|package| package.ends_with(&suffix)).collect()
    }
}

/// Something wrong with a set of environment variables for a cross build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvIssue {
    /// A global knob that would also hit host builds or override the scoped form.
    Unscoped(String),
    /// Scoped to a different target, so ignored for this one.
    ForeignTarget(String),
    /// A variable this target needs is not set.
    Missing(String),
}

impl fmt::Display for EnvIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unscoped(name) => write!(f, "{name} is not scoped to the target triple"),
            Self::ForeignTarget(name) => write!(f, "{name} is scoped to a different target"),
            Self::Missing(name) => write!(f, "{name} is required but not set"),
        }
    }
}

/// The ordered environment a cross build for one target needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossEnv {
    target: TargetTriple,
    vars: Vec<(String, String)>,
}

impl CrossEnv {
    #[must_use]
    pub fn for_target(target: &TargetTriple, toolchain: &Toolchain) -> Self {
        let key = target.cargo_env_key();
        let suffix = target.env_suffix();
        let sysroot = toolchain.sysroot();

        let vars = vec![
            (format!("CARGO_TARGET_{key}_LINKER"), toolchain.tool("gcc")),
            (format!("CARGO_TARGET_{key}_RUNNER"), format!("{} -L {sysroot}", toolchain.qemu)),
            (format!("CC_{suffix}"), toolchain.tool("gcc")),
            (format!("CXX_{suffix}"), toolchain.tool("g++")),
            (format!("AR_{suffix}"), toolchain.tool("ar")),
            (format!("CMAKE_TOOLCHAIN_FILE_{suffix}"), toolchain.cmake_toolchain_file.clone()),
            (format!("BINDGEN_EXTRA_CLANG_ARGS_{suffix}"), format!("--sysroot={sysroot}")),
            (format!("CFLAGS_{suffix}"), toolchain.cflags.clone()),
            (format!("CXXFLAGS_{suffix}"), toolchain.cflags.clone()),
            (
                format!("PKG_CONFIG_PATH_{suffix}"),
                format!("/usr/lib/{}/pkgconfig:/usr/share/pkgconfig", toolchain.prefix),
            ),
            (format!("PKG_CONFIG_SYSROOT_DIR_{suffix}"), "/".to_owned()),
            (format!("PKG_CONFIG_ALLOW_CROSS_{suffix}"), "1".to_owned()),
            ("RUST_TEST_THREADS".to_owned(), "1".to_owned()),
        ];

        Self { target: target.clone(), vars }
    }

    #[must_use]
    pub const fn target(&self) -> &TargetTriple {
        &self.target
    }

    #[must_use]
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// One `ENV NAME="value"` line per variable, in order.
    #[must_use]
    pub fn render_dockerfile_env(&self) -> String {
        self.vars.iter().map(|(name, value)| format!("ENV {name}=\"{value}\"\n")).collect()
    }

    /// Checks `vars` (e.g. the `ENV` instructions of a Dockerfile) against this environment.
    ///
    /// Unrelated variables such as `PATH` are ignored. Values are not compared: the image
    /// may install tools elsewhere as long as every setting reaches the right target.
    #[must_use]
    pub fn validate<'a>(&self, vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<EnvIssue> {
        let mut seen = Vec::new();
        let mut issues = Vec::new();

        for (name, _) in vars {
            if let Some(issue) = self.classify(name) {
                issues.push(issue);
            }
            seen.push(name);
        }

        issues.extend(
            self.vars
                .iter()
                .filter(|(name, _)| !seen.contains(&name.as_str()))
                .map(|(name, _)| EnvIssue::Missing(name.clone())),
        );
        issues
    }

    fn classify(&self, name: &str) -> Option<EnvIssue> {
        if SCOPED_KNOBS.contains(&name) || UNSCOPED_OVERRIDES.contains(&name) {
            return Some(EnvIssue::Unscoped(name.to_owned()));
        }

        if let Some(rest) = name.strip_prefix("CARGO_TARGET_") {
            // CARGO_TARGET_DIR is the output directory, not a per-target setting.
            if rest == "DIR" {
                return None;
            }
            let key = self.target.cargo_env_key();
            let ours = rest.strip_prefix(key.as_str()).is_some_and(|tail| tail.starts_with('_'));
            return (!ours).then(|| EnvIssue::ForeignTarget(name.to_owned()));
        }

        let suffix = self.target.env_suffix();
        SCOPED_KNOBS.iter().find_map(|knob| {
            let scope = name.strip_prefix(knob)?.strip_prefix('_')?;
            (scope != suffix && scope != self.target.as_str())
                .then(|| EnvIssue::ForeignTarget(name.to_owned()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_domain::constants::TARGET_TRIPLE;
    use proptest::prelude::*;

    fn rpi() -> CrossEnv {
        let target = TargetTriple::parse(TARGET_TRIPLE).unwrap();
        let toolchain = Toolchain::for_target(&target).unwrap();
        CrossEnv::for_target(&target, &toolchain)
    }

    #[test]
    fn builder_packages_cover_tools_and_target_libraries() {
        let toolchain = Toolchain::for_target(&TargetTriple::parse(TARGET_TRIPLE).unwrap()).unwrap();
        let packages = toolchain.required_packages();
        for tool in ["gcc-arm-linux-gnueabihf", "pkg-config", "cmake", "qemu-user"] {
            assert!(packages.iter().any(|package| package == tool), "{tool} missing");
        }
        assert_eq!(toolchain.target_packages(), ["libudev-dev:armhf", "libssl-dev:armhf"]);
    }

    #[test]
    fn triple_parts_and_env_names() {
        let triple = TargetTriple::parse("armv7-unknown-linux-gnueabihf").unwrap();
        assert_eq!(triple.arch(), "armv7");
        assert_eq!(triple.vendor(), "unknown");
        assert_eq!(triple.os(), "linux");
        assert_eq!(triple.abi(), Some("gnueabihf"));
        assert_eq!(triple.env_suffix(), "armv7_unknown_linux_gnueabihf");
        assert_eq!(triple.cargo_env_key(), "ARMV7_UNKNOWN_LINUX_GNUEABIHF");

        let triple: TargetTriple = "wasm32-unknown-unknown".parse().unwrap();
        assert_eq!(triple.abi(), None);
    }

    #[test]
    fn malformed_triples_are_rejected() {
        for raw in ["", "armv7", "armv7-linux", "a-b-c-d-e", "armv7--linux", "ARMV7-unknown-linux"] {
            assert!(TargetTriple::parse(raw).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn rpi_environment_is_fully_scoped() {
        let env = rpi();
        assert_eq!(
            env.get("CARGO_TARGET_ARMV7_UNKNOWN_LINUX_GNUEABIHF_LINKER"),
            Some("arm-linux-gnueabihf-gcc")
        );
        assert_eq!(
            env.get("CARGO_TARGET_ARMV7_UNKNOWN_LINUX_GNUEABIHF_RUNNER"),
            Some("qemu-arm -L /usr/arm-linux-gnueabihf")
        );
        assert_eq!(env.get("CC_armv7_unknown_linux_gnueabihf"), Some("arm-linux-gnueabihf-gcc"));
        assert_eq!(env.get("CFLAGS_armv7_unknown_linux_gnueabihf"), Some(ARMV7_CFLAGS));
        assert_eq!(env.get("PKG_CONFIG_ALLOW_CROSS_armv7_unknown_linux_gnueabihf"), Some("1"));
        assert_eq!(env.get("CC"), None);
        assert_eq!(env.get("CARGO_BUILD_TARGET"), None);

        let pairs = env.vars().iter().map(|(k, v)| (k.as_str(), v.as_str()));
        assert_eq!(env.validate(pairs), vec![]);
    }

    #[test]
    fn validate_flags_global_knobs() {
        let env = rpi();
        let mut vars: Vec<(&str, &str)> =
            env.vars().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        vars.push(("CC", "gcc"));
        vars.push(("PKG_CONFIG_PATH", "/usr/lib/pkgconfig"));
        vars.push(("CARGO_BUILD_TARGET", TARGET_TRIPLE));
        vars.push(("PATH", "/usr/bin"));
        vars.push(("CARGO_TARGET_DIR", "/tmp/target"));

        assert_eq!(
            env.validate(vars),
            vec![
                EnvIssue::Unscoped("CC".into()),
                EnvIssue::Unscoped("PKG_CONFIG_PATH".into()),
                EnvIssue::Unscoped("CARGO_BUILD_TARGET".into()),
            ]
        );
    }

    #[test]
    fn validate_flags_foreign_and_missing_scopes() {
        let env = rpi();
        let vars = [
            ("CARGO_TARGET_ARMV7_UNKNOWN_LINUX_GNUEABIHF_LINKER", "arm-linux-gnueabihf-gcc"),
            ("CARGO_TARGET_ARM_UNKNOWN_LINUX_GNUEABIHF_LINKER", "arm-linux-gnueabihf-gcc"),
            ("CC_arm_unknown_linux_gnueabihf", "arm-linux-gnueabihf-gcc"),
            ("CXX_armv7-unknown-linux-gnueabihf", "arm-linux-gnueabihf-g++"),
        ];

        let issues = env.validate(vars);
        assert_eq!(
            issues[0],
            EnvIssue::ForeignTarget("CARGO_TARGET_ARM_UNKNOWN_LINUX_GNUEABIHF_LINKER".into())
        );
        assert_eq!(issues[1], EnvIssue::ForeignTarget("CC_arm_unknown_linux_gnueabihf".into()));
        assert!(issues.contains(&EnvIssue::Missing("CC_armv7_unknown_linux_gnueabihf".into())));
        assert!(issues.contains(&EnvIssue::Missing("RUST_TEST_THREADS".into())));
        assert!(!issues.contains(&EnvIssue::Missing(
            "CARGO_TARGET_ARMV7_UNKNOWN_LINUX_GNUEABIHF_LINKER".into()
        )));
    }

    #[test]
    fn rendered_env_lines_quote_values() {
        let rendered = rpi().render_dockerfile_env();
        assert!(rendered.lines().all(|line| line.starts_with("ENV ") && line.ends_with('"')));
        assert!(rendered.contains(&format!("ENV CFLAGS_armv7_unknown_linux_gnueabihf=\"{ARMV7_CFLAGS}\"\n")));
    }

    #[test]
    fn unknown_toolchain_is_an_error() {
        let target = TargetTriple::parse("x86_64-unknown-linux-gnu").unwrap();
        assert!(Toolchain::for_target(&target).is_err());
    }

    proptest! {
        /// Swapping the target moves every scoped name along with it.
        #[test]
        fn env_names_follow_the_triple(arch in "[a-z][a-z0-9_]{0,7}", os in "[a-z]{1,8}", abi in "[a-z]{1,8}") {
            let target = TargetTriple::parse(&format!("{arch}-unknown-{os}-{abi}")).unwrap();
            let toolchain = Toolchain::for_target(&TargetTriple::parse(TARGET_TRIPLE).unwrap()).unwrap();
            let env = CrossEnv::for_target(&target, &toolchain);

            let suffix = target.env_suffix();
            let key = target.cargo_env_key();
            for (name, _) in env.vars() {
                prop_assert!(
                    name == "RUST_TEST_THREADS"
                        || name.ends_with(&format!("_{suffix}"))
                        || name.starts_with(&format!("CARGO_TARGET_{key}_")),
                    "{} is not scoped to {}", name, target
                );
            }

            let rpi = rpi();
            let pairs = env.vars().iter().map(|(k, v)| (k.as_str(), v.as_str()));
            let issues = rpi.validate(pairs);
            if target.as_str() != TARGET_TRIPLE {
                prop_assert!(issues.iter().any(|issue| matches!(issue, EnvIssue::ForeignTarget(_))));
            }
        }
    }
}
