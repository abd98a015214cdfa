//! Bundling the install tree into a distributable tar.xz.
//!
//! Shared objects lose their executable flag when cmake copies them into
//! the install prefix; the bundler restores it before archiving. Every
//! file lands in the archive under the bundle name as top-level directory.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;
use xz2::write::XzEncoder;

const XZ_LEVEL: u32 = 6;

fn shared_library_pattern() -> Result<Regex> {
    Regex::new(r"\.so(\.\d+)*$").context("invalid shared library pattern")
}

/// Add the execute bit for every permission class that already has the
/// read bit.
fn normalize_library_mode(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    permissions.set_mode(mode | ((mode & 0o444) >> 2));
    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to chmod {}", path.display()))?;
    Ok(())
}

/// Archive every file under `install_dir` into `archive_path`, rooted at
/// `bundle_name`. The archive is written to a temporary path and renamed
/// into place on success.
pub fn bundle_install_tree(
    bundle_name: &str,
    archive_path: &Path,
    install_dir: &Path,
) -> Result<()> {
    println!("Bundling LLVM to {}.", archive_path.display());

    let library = shared_library_pattern()?;

    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = archive_path.with_file_name(format!("{file_name}.tmp"));

    let file = File::create(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    let mut tar = tar::Builder::new(XzEncoder::new(file, XZ_LEVEL));
    tar.follow_symlinks(false);

    for entry in WalkDir::new(install_dir) {
        let entry = entry.context("failed to walk install tree")?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if file_type.is_file() && library.is_match(&name) {
            normalize_library_mode(path)?;
        }

        let relative = path
            .strip_prefix(install_dir)
            .context("walked path escaped the install tree")?;
        let arcname = Path::new(bundle_name).join(relative);
        tar.append_path_with_name(path, &arcname)
            .with_context(|| format!("failed to archive {}", path.display()))?;
    }

    let encoder = tar.into_inner().context("failed to finish tar stream")?;
    encoder.finish().context("failed to finish xz stream")?;
    fs::rename(&staging, archive_path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use xz2::read::XzDecoder;

    fn write_file(path: &Path, mode: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        f.write_all(b"contents").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn archive_modes(archive: &Path) -> std::collections::BTreeMap<String, u32> {
        let file = File::open(archive).unwrap();
        let mut tar = tar::Archive::new(XzDecoder::new(file));
        tar.entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (
                    e.path().unwrap().to_string_lossy().into_owned(),
                    e.header().mode().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_shared_library_gains_execute_bit() {
        let tmp = TempDir::new().unwrap();
        let install = tmp.path().join("install");
        write_file(&install.join("lib/libclang.so.18.1"), 0o644);
        write_file(&install.join("bin/README.txt"), 0o644);

        let archive = tmp.path().join("bundle.tar.xz");
        bundle_install_tree("clang+llvm-18.1.8-x86_64", &archive, &install).unwrap();

        let modes = archive_modes(&archive);
        // read bits 0o644 -> execute bits for user and group: 0o755
        assert_eq!(
            modes["clang+llvm-18.1.8-x86_64/lib/libclang.so.18.1"] & 0o777,
            0o755
        );
        // non-library files keep their permissions
        assert_eq!(modes["clang+llvm-18.1.8-x86_64/bin/README.txt"] & 0o777, 0o644);
    }

    #[test]
    fn test_plain_so_suffix_matches_and_versioned_name_roots() {
        let re = shared_library_pattern().unwrap();
        assert!(re.is_match("libclang.so"));
        assert!(re.is_match("libclang.so.18"));
        assert!(re.is_match("libclang.so.18.1"));
        assert!(!re.is_match("libclang.so.bak"));
        assert!(!re.is_match("readme.txt"));
    }

    #[test]
    fn test_bundle_is_rooted_at_bundle_name() {
        let tmp = TempDir::new().unwrap();
        let install = tmp.path().join("install");
        write_file(&install.join("bin/clangd"), 0o755);

        let archive = tmp.path().join("bundle.tar.xz");
        bundle_install_tree("clang+llvm-1.0.0-test", &archive, &install).unwrap();

        let modes = archive_modes(&archive);
        assert!(modes.contains_key("clang+llvm-1.0.0-test/bin/clangd"));
        // staging file was renamed away
        assert!(!tmp.path().join("bundle.tar.xz.tmp").exists());
    }
}
