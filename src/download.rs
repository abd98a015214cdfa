//! Source archive download and extraction.
//!
//! Downloads stream to disk so the archive is never buffered in memory.
//! Both steps are gated on their output already existing, so a re-run
//! skips completed work. Both also complete atomically: the download
//! streams to a temporary sibling that is renamed into place, and
//! extraction unpacks into a temporary sibling before the source tree is
//! renamed into place, so an interrupted run is never mistaken for a
//! completed one.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use xz2::read::XzDecoder;

/// Download `url` into `dest_dir`, named after the URL's last segment.
pub fn download_file(client: &Client, url: &str, dest_dir: &Path) -> Result<PathBuf> {
    let name = url.rsplit('/').next().unwrap_or(url);
    println!("Downloading {name}.");

    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("downloading {url} failed"))?;

    // A partial file at the final path would be mistaken for a complete
    // download on the next attempt, so stream to a sibling and rename.
    let dest = dest_dir.join(name);
    let staging = dest_dir.join(format!("{name}.tmp"));
    if let Err(error) = stream_to_file(&mut response, &staging) {
        fs::remove_file(&staging).ok();
        return Err(error);
    }
    fs::rename(&staging, &dest)
        .with_context(|| format!("failed to move {} into place", staging.display()))?;

    Ok(dest)
}

fn stream_to_file(response: &mut reqwest::blocking::Response, dest: &Path) -> Result<()> {
    let mut file = File::create(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;

    // Response implements Read; io::copy streams in bounded chunks.
    io::copy(response, &mut file)
        .with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(())
}

/// Extract a `.tar.xz` archive whose top-level directory is `root_name`
/// into `dest_dir`, atomically.
pub fn extract_archive(archive: &Path, dest_dir: &Path, root_name: &str) -> Result<()> {
    println!("Extracting archive {}.", archive.display());

    let file = File::open(archive)
        .with_context(|| format!("failed to open {}", archive.display()))?;

    let staging = dest_dir.join(format!("{root_name}.extract.tmp"));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    let mut tar = tar::Archive::new(XzDecoder::new(io::BufReader::new(file)));
    tar.unpack(&staging)
        .with_context(|| format!("failed to extract {} (corrupt archive?)", archive.display()))?;

    let extracted_root = staging.join(root_name);
    if !extracted_root.is_dir() {
        bail!(
            "archive {} did not contain expected directory {}",
            archive.display(),
            root_name
        );
    }
    fs::rename(&extracted_root, dest_dir.join(root_name))?;
    fs::remove_dir_all(&staging).ok();

    Ok(())
}

/// Make the extracted source tree available under `base_dir`.
///
/// Skips the download when the archive file already exists and the
/// extraction when the source directory already exists.
pub fn ensure_source(
    client: &Client,
    base_url: &str,
    source_name: &str,
    base_dir: &Path,
) -> Result<PathBuf> {
    let source_dir = base_dir.join(source_name);
    if source_dir.exists() {
        println!("Source already extracted at {}.", source_dir.display());
        return Ok(source_dir);
    }

    let archive = base_dir.join(format!("{source_name}.tar.xz"));
    if !archive.exists() {
        download_file(client, &format!("{base_url}/{source_name}.tar.xz"), base_dir)?;
    }

    if let Err(error) = extract_archive(&archive, base_dir, source_name) {
        // An archive that does not extract will not extract on the next
        // attempt either; discard it so a retry downloads a fresh copy.
        fs::remove_file(&archive).ok();
        return Err(error);
    }
    Ok(source_dir)
}
