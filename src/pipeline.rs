//! Stage sequencing for the build-and-publish pipeline.
//!
//! Stages run in a fixed order; each is skipped when its end product
//! already exists, so an interrupted run resumes where it left off.
//! Gates test the stage's product (a built binary, the bundle file)
//! rather than its build directory, so a half-written build directory is
//! re-run rather than mistaken for a completed stage.

use anyhow::Result;
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};

use crate::release::ReleaseSpec;
use crate::retry::{fatal, retryable, Retrier};
use crate::target::TargetInfo;
use crate::{build, bundle, download, inspect, process, publish};

/// Every resolved path of a run, derived once from the CLI arguments.
///
/// All state lives under `<base>/<target triple>/`, which is what keeps
/// concurrent runs for different architectures isolated.
pub struct BuildContext {
    /// Per-target working directory: `<base>/<target triple>`.
    pub work_dir: PathBuf,
    /// Directory that may hold `toolchain_files/` for cross builds.
    pub toolchain_root: PathBuf,
    pub target: &'static TargetInfo,
    pub spec: ReleaseSpec,
}

impl BuildContext {
    pub fn new(base_dir: &Path, target: &'static TargetInfo, spec: ReleaseSpec) -> Self {
        BuildContext {
            work_dir: base_dir.join(target.target),
            toolchain_root: base_dir.to_path_buf(),
            target,
            spec,
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.work_dir.join(self.spec.source_name())
    }

    pub fn tblgen_build_dir(&self) -> PathBuf {
        self.work_dir.join("tblgen_build")
    }

    pub fn llvm_build_dir(&self) -> PathBuf {
        self.work_dir.join("llvm_build")
    }

    pub fn llvm_install_dir(&self) -> PathBuf {
        self.work_dir.join("llvm_install")
    }

    pub fn bundle_name(&self) -> String {
        self.spec.bundle_name(self.target.archive)
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.tar.xz", self.bundle_name()))
    }

    /// Product that marks the tblgen stage complete.
    pub fn tblgen_marker(&self) -> PathBuf {
        self.tblgen_build_dir().join("bin/llvm-tblgen")
    }

    /// Product that marks the full build complete.
    pub fn install_marker(&self) -> PathBuf {
        self.llvm_install_dir().join("bin/clangd")
    }
}

/// Run the whole pipeline. `host` is `None` when uploading is disabled.
pub fn run(
    ctx: &BuildContext,
    client: &Client,
    retrier: &Retrier,
    host: Option<&dyn publish::ReleaseHost>,
) -> Result<()> {
    fs::create_dir_all(&ctx.work_dir)?;

    retrier.run("fetch source", || {
        retryable(
            download::ensure_source(
                client,
                &ctx.spec.base_url(),
                &ctx.spec.source_name(),
                &ctx.work_dir,
            )
            .map(|_| ()),
        )
    })?;

    if ctx.tblgen_marker().exists() {
        println!("tblgen already built at {}.", ctx.tblgen_marker().display());
    } else {
        retrier.run("build tblgen", || {
            // A missing tool fails identically on every attempt.
            let cmake = fatal(process::find_tool("cmake"))?;
            retryable(build::build_tblgen(
                &cmake,
                &ctx.tblgen_build_dir(),
                &ctx.source_dir(),
            ))
        })?;
    }

    if ctx.install_marker().exists() {
        println!(
            "LLVM already installed at {}.",
            ctx.llvm_install_dir().display()
        );
    } else {
        retrier.run("build LLVM", || {
            let cmake = fatal(process::find_tool("cmake"))?;
            retryable(build::build_llvm(
                &cmake,
                &ctx.llvm_build_dir(),
                &ctx.llvm_install_dir(),
                &ctx.source_dir(),
                &ctx.tblgen_build_dir(),
                ctx.target,
                &ctx.toolchain_root,
            ))
        })?;
    }

    if ctx.target.platform == "linux" {
        retrier.run("inspect binaries", || {
            let objdump = fatal(process::find_tool("objdump"))?;
            retryable(inspect::inspect_install(&objdump, &ctx.llvm_install_dir()).map(|_| ()))
        })?;
    }

    let bundle_path = ctx.bundle_path();
    if bundle_path.exists() {
        println!("Bundle already exists at {}.", bundle_path.display());
    } else {
        retrier.run("bundle install tree", || {
            retryable(bundle::bundle_install_tree(
                &ctx.bundle_name(),
                &bundle_path,
                &ctx.llvm_install_dir(),
            ))
        })?;
    }

    if let Some(host) = host {
        retrier.run("publish release", || {
            retryable(publish::publish_release(host, &ctx.spec, &bundle_path))
        })?;
    }

    Ok(())
}
