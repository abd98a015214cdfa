//! Shared-library dependency introspection.
//!
//! Runs `objdump -p` on the built binaries and parses two line families
//! from its output: NEEDED entries (which libraries the binary links
//! against) and versioned symbol requirements like `GLIBC_2.17`. The
//! report lists each dependency and the maximum symbol version required
//! per library. Purely diagnostic; nothing downstream consumes it.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

use crate::process::Cmd;
use crate::version::Version;

/// Maximum-version bookkeeping per library, e.g. `GLIBC -> [2.2.5, 2.17]`.
pub type DependencyVersionMap = BTreeMap<String, Vec<Version>>;

struct Patterns {
    needed: Regex,
    version: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Patterns {
            needed: Regex::new(r"^\s*NEEDED\s+(?P<dependency>\S+)\s*$")
                .context("invalid NEEDED pattern")?,
            version: Regex::new(r"^\s*0x[0-9a-f]+ 0x00 \d+ (?P<library>.+)_(?P<version>[0-9.]+)$")
                .context("invalid version pattern")?,
        })
    }
}

fn scan_output(
    patterns: &Patterns,
    output: &str,
    dependencies: &mut Vec<String>,
    versions: &mut DependencyVersionMap,
) -> Result<()> {
    for line in output.lines() {
        if let Some(captures) = patterns.needed.captures(line) {
            dependencies.push(captures["dependency"].to_string());
        }

        if let Some(captures) = patterns.version.captures(line) {
            let library = captures["library"].to_string();
            let version: Version = captures["version"]
                .parse()
                .with_context(|| format!("bad symbol version in line: {line}"))?;
            versions.entry(library).or_default().push(version);
        }
    }
    Ok(())
}

/// Inspect one binary, printing its NEEDED dependencies and accumulating
/// symbol version requirements into `versions`.
fn inspect_binary(
    objdump: &Path,
    name: &str,
    path: &Path,
    versions: &mut DependencyVersionMap,
) -> Result<()> {
    let output = Cmd::new(objdump)
        .arg("-p")
        .arg_path(path)
        .error_msg(format!("objdump on {} failed", path.display()))
        .run()?;

    let patterns = Patterns::new()?;
    let mut dependencies = Vec::new();
    scan_output(&patterns, &output.stdout, &mut dependencies, versions)?;

    println!("List of {name} dependencies:");
    for dependency in &dependencies {
        println!("{dependency}");
    }
    Ok(())
}

/// Inspect the install tree's main outputs and report the minimum library
/// versions a host needs to run them.
pub fn inspect_install(objdump: &Path, install_dir: &Path) -> Result<DependencyVersionMap> {
    println!("Checking LLVM dependencies.");
    let mut versions = DependencyVersionMap::new();

    inspect_binary(
        objdump,
        "libclang",
        &install_dir.join("lib/libclang.so"),
        &mut versions,
    )?;
    inspect_binary(
        objdump,
        "clangd",
        &install_dir.join("bin/clangd"),
        &mut versions,
    )?;

    println!("Minimum versions required:");
    for (library, values) in &versions {
        if let Some(max) = values.iter().max() {
            println!("{library} {max}");
        }
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed `objdump -p` output for a glibc-linked shared object.
    const SAMPLE: &str = "
Dynamic Section:
  NEEDED               libm.so.6
  NEEDED               libc.so.6
  SONAME               libclang.so.18.1

Version References:
  required from libc.so.6:
    0x09691a75 0x00 05 GLIBC_2.2.5
    0x06969194 0x00 04 GLIBC_2.17
    0x069691b4 0x00 03 GLIBC_2.3.4
";

    #[test]
    fn test_scan_collects_needed_and_max_version() {
        let patterns = Patterns::new().unwrap();
        let mut dependencies = Vec::new();
        let mut versions = DependencyVersionMap::new();
        scan_output(&patterns, SAMPLE, &mut dependencies, &mut versions).unwrap();

        assert_eq!(dependencies, vec!["libm.so.6", "libc.so.6"]);

        // One library, three versions, max wins.
        assert_eq!(versions.len(), 1);
        let glibc = &versions["GLIBC"];
        assert_eq!(glibc.len(), 3);
        assert_eq!(
            glibc.iter().max().unwrap().to_string(),
            "2.17.0"
        );
    }

    #[test]
    fn test_scan_ignores_unrelated_lines() {
        let patterns = Patterns::new().unwrap();
        let mut dependencies = Vec::new();
        let mut versions = DependencyVersionMap::new();
        scan_output(
            &patterns,
            "not an objdump line\n  SONAME  libfoo.so\n",
            &mut dependencies,
            &mut versions,
        )
        .unwrap();

        assert!(dependencies.is_empty());
        assert!(versions.is_empty());
    }

    #[test]
    fn test_version_pattern_splits_on_last_underscore() {
        let patterns = Patterns::new().unwrap();
        let mut dependencies = Vec::new();
        let mut versions = DependencyVersionMap::new();
        scan_output(
            &patterns,
            "    0x0297f869 0x00 10 CXXABI_1.3.9\n    0x056bafd3 0x00 09 GLIBCXX_3.4.29\n",
            &mut dependencies,
            &mut versions,
        )
        .unwrap();

        assert!(versions.contains_key("CXXABI"));
        assert!(versions.contains_key("GLIBCXX"));
        assert_eq!(versions["GLIBCXX"][0].to_string(), "3.4.29");
    }
}
