//! The two cmake build stages.
//!
//! First a host build of just the tablegen code generators, then the full
//! toolchain build that consumes them. Splitting the tablegen build out is
//! what makes cross-compiling work: the full build runs the generators on
//! the host while targeting another triple.

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::process::Cmd;
use crate::target::TargetInfo;

/// Parallelism degree handed to cmake.
pub fn logical_cores() -> usize {
    num_cpus::get().max(1)
}

/// Configure and build only the tablegen targets needed to generate code
/// for the full build.
pub fn build_tblgen(cmake: &Path, build_dir: &Path, source_dir: &Path) -> Result<()> {
    fs::create_dir_all(build_dir)?;

    Cmd::new(cmake)
        .args(["-G", "Ninja", "-DCMAKE_BUILD_TYPE=Release"])
        .arg("-DLLVM_ENABLE_PROJECTS=clang")
        .arg_path(&source_dir.join("llvm"))
        .dir(build_dir)
        .error_msg("cmake configure for tblgen failed")
        .run_streaming()?;

    Cmd::new(cmake)
        .args(["--build", ".", "--parallel"])
        .arg(logical_cores().to_string())
        .args(["--target", "llvm-tblgen", "clang-tblgen"])
        .dir(build_dir)
        .error_msg("tblgen build failed")
        .run_streaming()?;

    Ok(())
}

/// Configure, build, and install the full toolchain.
///
/// `toolchain_root` is the directory that may hold
/// `toolchain_files/<target>.cmake` descriptions for cross builds.
pub fn build_llvm(
    cmake: &Path,
    build_dir: &Path,
    install_dir: &Path,
    source_dir: &Path,
    tblgen_dir: &Path,
    target: &TargetInfo,
    toolchain_root: &Path,
) -> Result<()> {
    println!("Host triple: {}", target.host);
    println!("Target triple: {}", target.target);

    fs::create_dir_all(build_dir)?;
    fs::create_dir_all(install_dir)?;

    // See https://llvm.org/docs/CMake.html#llvm-specific-variables for the
    // CMake variables defined by LLVM. A release build implies
    // LLVM_ENABLE_ASSERTIONS=OFF. Everything optional is disabled to keep
    // the runtime dependencies of the bundle minimal.
    let mut configure = Cmd::new(cmake)
        .args(["-G", "Ninja", "-DCMAKE_BUILD_TYPE=Release"])
        .arg(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            install_dir.display()
        ))
        .arg("-DLLVM_ENABLE_PROJECTS=clang;clang-tools-extra;openmp")
        .arg(format!("-DLLVM_DEFAULT_TARGET_TRIPLE={}", target.target))
        .arg("-DLLVM_TARGETS_TO_BUILD=all")
        .arg(format!(
            "-DLLVM_TABLEGEN={}",
            tblgen_dir.join("bin/llvm-tblgen").display()
        ))
        .arg(format!(
            "-DCLANG_TABLEGEN={}",
            tblgen_dir.join("bin/clang-tblgen").display()
        ))
        .arg(format!("-DLLVM_TARGET_ARCH={}", target.arch))
        .args([
            "-DLLVM_INCLUDE_EXAMPLES=OFF",
            "-DLLVM_INCLUDE_TESTS=OFF",
            "-DLLVM_INCLUDE_DOCS=OFF",
            "-DLLVM_ENABLE_TERMINFO=OFF",
            "-DLLVM_ENABLE_ZLIB=OFF",
            "-DLLVM_ENABLE_LIBEDIT=OFF",
            "-DLLVM_ENABLE_LIBXML2=OFF",
            "-DLLVM_ENABLE_ZSTD=OFF",
        ]);

    if target.target != target.host {
        // Cross-compiling; inject the toolchain description if one exists.
        let toolchain_file = toolchain_root
            .join("toolchain_files")
            .join(format!("{}.cmake", target.target));
        if toolchain_file.exists() {
            configure = configure.arg(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                toolchain_file.display()
            ));
        }
    }

    configure
        .arg_path(&source_dir.join("llvm"))
        .dir(build_dir)
        .error_msg("cmake configure for LLVM failed")
        .run_streaming()?;

    Cmd::new(cmake)
        .args(["--build", ".", "--parallel"])
        .arg(logical_cores().to_string())
        .args(["--target", "install"])
        .dir(build_dir)
        .error_msg("LLVM build failed")
        .run_streaming()?;

    Ok(())
}
