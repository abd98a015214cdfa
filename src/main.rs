//! llvmpack - builds LLVM+Clang from source, bundles the install tree,
//! and publishes it as a GitHub release asset.
//!
//! The pipeline is resumable: each stage is skipped when its output
//! already exists, so a failed run can be restarted without redoing
//! completed work.

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;

use llvmpack::config::PublishConfig;
use llvmpack::pipeline::{self, BuildContext};
use llvmpack::publish::{GithubClient, ReleaseHost};
use llvmpack::release::ReleaseSpec;
use llvmpack::retry::Retrier;
use llvmpack::target;

/// Repository the bundle is published to, under the configured org.
const RELEASE_REPO: &str = "llvm";

#[derive(Parser)]
#[command(name = "llvmpack")]
#[command(about = "Build, bundle, and publish an LLVM+Clang release")]
struct Cli {
    /// LLVM version, e.g. 18.1.8
    version: String,

    /// LLVM release candidate number
    #[arg(long)]
    release_candidate: Option<u32>,

    /// Don't upload the archive to GitHub
    #[arg(long)]
    no_upload: bool,

    /// GitHub user name (default: GITHUB_USERNAME environment variable)
    #[arg(long)]
    gh_user: Option<String>,

    /// GitHub API token (default: GITHUB_TOKEN environment variable)
    #[arg(long)]
    gh_token: Option<String>,

    /// GitHub organization to upload the archive to
    #[arg(long, default_value = "ycm-core")]
    gh_org: String,

    /// Base working directory (default: current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Target architecture, for cross-compiling
    #[arg(long)]
    target_architecture: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before the credential fallbacks are read.
    dotenvy::dotenv().ok();

    let arch = cli
        .target_architecture
        .unwrap_or_else(|| env::consts::ARCH.to_string());
    let target = target::resolve(env::consts::OS, &arch)?;

    // Credentials are checked before any work begins.
    let publish_config = if cli.no_upload {
        None
    } else {
        Some(PublishConfig::resolve(
            cli.gh_user,
            cli.gh_token,
            cli.gh_org,
        )?)
    };

    let base_dir = match cli.base_dir {
        Some(dir) => {
            fs::create_dir_all(&dir)?;
            fs::canonicalize(&dir)
                .with_context(|| format!("invalid base directory {}", dir.display()))?
        }
        None => env::current_dir()?,
    };

    let spec = ReleaseSpec {
        version: cli.version,
        release_candidate: cli.release_candidate,
    };
    let ctx = BuildContext::new(&base_dir, target, spec);

    // One client serves the source download and the release API; GitHub
    // rejects requests without a User-Agent.
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("llvmpack/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let github =
        publish_config.map(|config| GithubClient::new(client.clone(), &config, RELEASE_REPO));

    pipeline::run(
        &ctx,
        &client,
        &Retrier::default(),
        github.as_ref().map(|g| g as &dyn ReleaseHost),
    )
}
