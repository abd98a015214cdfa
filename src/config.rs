//! Publishing configuration.
//!
//! Credentials come from the command line or from `GITHUB_USERNAME` /
//! `GITHUB_TOKEN` (a `.env` file is loaded before these are read).
//! Missing credentials are a startup error when uploading is enabled.

use anyhow::{bail, Result};
use std::env;

/// Credentials and destination for publishing the bundle.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub user: String,
    pub token: String,
    /// GitHub organization owning the release repository.
    pub org: String,
}

impl PublishConfig {
    /// Resolve credentials, falling back to the environment.
    pub fn resolve(user: Option<String>, token: Option<String>, org: String) -> Result<Self> {
        Self::resolve_with(user, token, org, |name| env::var(name).ok())
    }

    fn resolve_with(
        user: Option<String>,
        token: Option<String>,
        org: String,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let user = match user.or_else(|| env("GITHUB_USERNAME")) {
            Some(u) => u,
            None => bail!("must specify either --gh-user or GITHUB_USERNAME in the environment"),
        };
        let token = match token.or_else(|| env("GITHUB_TOKEN")) {
            Some(t) => t,
            None => bail!("must specify either --gh-token or GITHUB_TOKEN in the environment"),
        };
        Ok(PublishConfig { user, token, org })
    }
}
