//! Supported build targets.
//!
//! Maps a (platform, architecture) pair to the triples used for
//! configuring the build and naming the published archive. Platform and
//! architecture tokens follow `std::env::consts::{OS, ARCH}`.

use anyhow::{bail, Result};

/// Triples for one supported (platform, architecture) pair.
#[derive(Debug)]
pub struct TargetInfo {
    /// Platform token (`linux`, `macos`).
    pub platform: &'static str,
    /// Architecture token (`x86_64`, `arm`, `aarch64`).
    pub arch: &'static str,
    /// Triple of the machine running the build.
    pub host: &'static str,
    /// Triple the toolchain generates code for.
    pub target: &'static str,
    /// Label used in the published archive name.
    pub archive: &'static str,
}

const TARGETS: &[TargetInfo] = &[
    TargetInfo {
        platform: "linux",
        arch: "x86_64",
        host: "x86_64-unknown-linux-gnu",
        target: "x86_64-unknown-linux-gnu",
        archive: "x86_64-unknown-linux-gnu",
    },
    TargetInfo {
        platform: "linux",
        arch: "arm",
        host: "x86_64-unknown-linux-gnu",
        target: "arm-linux-gnueabihf",
        archive: "armv7a-linux-gnueabihf",
    },
    TargetInfo {
        platform: "linux",
        arch: "aarch64",
        host: "x86_64-unknown-linux-gnu",
        target: "aarch64-linux-gnu",
        archive: "aarch64-linux-gnu",
    },
    TargetInfo {
        platform: "macos",
        arch: "x86_64",
        host: "x86_64-apple-darwin",
        target: "x86_64-apple-darwin",
        archive: "x86_64-apple-darwin",
    },
    TargetInfo {
        platform: "macos",
        arch: "aarch64",
        host: "x86_64-apple-darwin",
        target: "arm64-apple-darwin",
        archive: "arm64-apple-darwin",
    },
];

/// Resolve a (platform, architecture) pair to its target triples.
///
/// Fails with a configuration error listing the supported pairs if the
/// combination is not in the table.
pub fn resolve(platform: &str, arch: &str) -> Result<&'static TargetInfo> {
    if let Some(info) = TARGETS
        .iter()
        .find(|t| t.platform == platform && t.arch == arch)
    {
        return Ok(info);
    }

    let supported: Vec<String> = TARGETS
        .iter()
        .map(|t| format!("{}/{}", t.platform, t.arch))
        .collect();
    bail!(
        "unsupported platform/architecture pair {}/{} (supported: {})",
        platform,
        arch,
        supported.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_supported_pairs_resolve() {
        for entry in TARGETS {
            let info = resolve(entry.platform, entry.arch).unwrap();
            assert!(!info.host.is_empty());
            assert!(!info.target.is_empty());
            assert!(!info.archive.is_empty());
        }
    }

    #[test]
    fn test_unsupported_pair_fails() {
        let err = resolve("linux", "riscv64").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
        assert!(resolve("windows", "x86_64").is_err());
    }

    #[test]
    fn test_cross_targets_keep_linux_host() {
        let arm = resolve("linux", "arm").unwrap();
        assert_eq!(arm.host, "x86_64-unknown-linux-gnu");
        assert_ne!(arm.host, arm.target);
        assert_eq!(arm.archive, "armv7a-linux-gnueabihf");
    }
}
