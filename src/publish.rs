//! Publishing the bundle as a GitHub release asset.
//!
//! The flow replaces any same-named asset: list releases, delete the old
//! asset if the tag already exists, create the release if it does not,
//! then upload the bundle bytes. The `ReleaseHost` trait keeps the flow
//! testable without a live API.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Body, Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::config::PublishConfig;
use crate::release::ReleaseSpec;

const GITHUB_BASE_URL: &str = "https://api.github.com";
const BUNDLE_CONTENT_TYPE: &str = "application/x-xz";

/// One release as reported by the hosting API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub upload_url: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One uploaded file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
}

/// Request body for creating a release.
#[derive(Debug, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub prerelease: bool,
}

/// The narrow slice of a release-hosting API the publisher needs.
pub trait ReleaseHost {
    fn list_releases(&self) -> Result<Vec<Release>>;
    fn create_release(&self, release: &NewRelease) -> Result<Release>;
    fn delete_asset(&self, asset_id: u64) -> Result<()>;
    fn upload_asset(&self, upload_url: &str, name: &str, bundle: &Path) -> Result<()>;
}

/// GitHub REST implementation over basic auth.
pub struct GithubClient {
    client: Client,
    user: String,
    token: String,
    org: String,
    repo: String,
}

impl GithubClient {
    /// Wrap an existing HTTP client; the caller's User-Agent carries
    /// over, which GitHub requires on every request.
    pub fn new(client: Client, config: &PublishConfig, repo: &str) -> Self {
        GithubClient {
            client,
            user: config.user.clone(),
            token: config.token.clone(),
            org: config.org.clone(),
            repo: repo.to_string(),
        }
    }

    fn releases_url(&self) -> String {
        format!("{GITHUB_BASE_URL}/repos/{}/{}/releases", self.org, self.repo)
    }

    /// Pull the API's `message` field out of an error response.
    fn api_message(response: Response) -> String {
        response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

impl ReleaseHost for GithubClient {
    fn list_releases(&self) -> Result<Vec<Release>> {
        let response = self
            .client
            .get(self.releases_url())
            .basic_auth(&self.user, Some(&self.token))
            .send()
            .context("listing releases failed")?;

        if response.status() != reqwest::StatusCode::OK {
            bail!(
                "getting releases failed with message: {}",
                Self::api_message(response)
            );
        }
        response.json().context("malformed release list")
    }

    fn create_release(&self, release: &NewRelease) -> Result<Release> {
        let response = self
            .client
            .post(self.releases_url())
            .basic_auth(&self.user, Some(&self.token))
            .json(release)
            .send()
            .context("creating release failed")?;

        if response.status() != reqwest::StatusCode::CREATED {
            bail!(
                "releasing failed with message: {}",
                Self::api_message(response)
            );
        }
        response.json().context("malformed release response")
    }

    fn delete_asset(&self, asset_id: u64) -> Result<()> {
        let url = format!(
            "{GITHUB_BASE_URL}/repos/{}/{}/releases/assets/{asset_id}",
            self.org, self.repo
        );
        let response = self
            .client
            .delete(url)
            .basic_auth(&self.user, Some(&self.token))
            .send()
            .context("deleting asset failed")?;

        if response.status() != reqwest::StatusCode::NO_CONTENT {
            bail!(
                "deleting release asset failed with message: {}",
                Self::api_message(response)
            );
        }
        Ok(())
    }

    fn upload_asset(&self, upload_url: &str, name: &str, bundle: &Path) -> Result<()> {
        let file = File::open(bundle)
            .with_context(|| format!("failed to open {}", bundle.display()))?;

        let response = self
            .client
            .post(upload_url)
            .query(&[("name", name)])
            .header(CONTENT_TYPE, BUNDLE_CONTENT_TYPE)
            .basic_auth(&self.user, Some(&self.token))
            .body(Body::new(file))
            .send()
            .context("uploading asset failed")?;

        if response.status() != reqwest::StatusCode::CREATED {
            bail!(
                "uploading failed with message: {}",
                Self::api_message(response)
            );
        }
        Ok(())
    }
}

/// Publish the bundle under the release tag derived from `spec`.
///
/// If the release already exists, a same-named asset is deleted first so
/// the upload replaces it; otherwise the release is created (as a
/// prerelease for release candidates).
pub fn publish_release(host: &dyn ReleaseHost, spec: &ReleaseSpec, bundle_path: &Path) -> Result<()> {
    let tag = spec.bundle_version();
    let bundle_name = bundle_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("bundle path has no file name")?;

    let releases = host.list_releases()?;

    let mut upload_url = None;
    if let Some(release) = releases.iter().find(|r| r.tag_name == tag) {
        println!("Version {tag} already released.");
        upload_url = Some(release.upload_url.clone());

        if let Some(asset) = release.assets.iter().find(|a| a.name == bundle_name) {
            println!("Deleting {bundle_name} on GitHub.");
            host.delete_asset(asset.id)?;
        }
    }

    let upload_url = match upload_url {
        Some(url) => url,
        None => {
            println!("Releasing {tag} on GitHub.");
            let name = spec.display_name();
            let new_release = NewRelease {
                tag_name: tag.clone(),
                body: format!("{name} without realtime, terminfo, and zlib dependencies."),
                name,
                prerelease: spec.release_candidate.is_some(),
            };
            host.create_release(&new_release)?.upload_url
        }
    };

    // The API hands back a URI template; only the bare endpoint is used.
    let upload_url = upload_url.replace("{?name,label}", "");

    println!("Uploading {bundle_name} on GitHub.");
    host.upload_asset(&upload_url, &bundle_name, bundle_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MockHost {
        releases: Vec<Release>,
        calls: RefCell<Vec<String>>,
    }

    impl ReleaseHost for MockHost {
        fn list_releases(&self) -> Result<Vec<Release>> {
            self.calls.borrow_mut().push("list".into());
            Ok(self.releases.clone())
        }

        fn create_release(&self, release: &NewRelease) -> Result<Release> {
            self.calls
                .borrow_mut()
                .push(format!("create:{}:{}", release.tag_name, release.prerelease));
            Ok(Release {
                tag_name: release.tag_name.clone(),
                upload_url: "https://uploads.example/new{?name,label}".into(),
                assets: vec![],
            })
        }

        fn delete_asset(&self, asset_id: u64) -> Result<()> {
            self.calls.borrow_mut().push(format!("delete:{asset_id}"));
            Ok(())
        }

        fn upload_asset(&self, upload_url: &str, name: &str, _bundle: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("upload:{upload_url}:{name}"));
            Ok(())
        }
    }

    #[test]
    fn test_releases_url_targets_org_and_repo() {
        let config = PublishConfig {
            user: "user".into(),
            token: "token".into(),
            org: "ycm-core".into(),
        };
        let gh = GithubClient::new(Client::new(), &config, "llvm");
        assert_eq!(
            gh.releases_url(),
            "https://api.github.com/repos/ycm-core/llvm/releases"
        );
    }

    fn spec(rc: Option<u32>) -> ReleaseSpec {
        ReleaseSpec {
            version: "18.1.8".into(),
            release_candidate: rc,
        }
    }

    #[test]
    fn test_existing_release_replaces_asset_without_create() {
        let bundle = Path::new("/tmp/clang+llvm-18.1.8-x86_64.tar.xz");
        let host = MockHost {
            releases: vec![Release {
                tag_name: "18.1.8".into(),
                upload_url: "https://uploads.example/1{?name,label}".into(),
                assets: vec![Asset {
                    id: 42,
                    name: "clang+llvm-18.1.8-x86_64.tar.xz".into(),
                }],
            }],
            ..Default::default()
        };

        publish_release(&host, &spec(None), bundle).unwrap();

        let calls = host.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                "list".to_string(),
                "delete:42".to_string(),
                "upload:https://uploads.example/1:clang+llvm-18.1.8-x86_64.tar.xz".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_release_is_created_as_prerelease_for_rc() {
        let bundle = Path::new("/tmp/clang+llvm-18.1.8-rc1-x86_64.tar.xz");
        let host = MockHost::default();

        publish_release(&host, &spec(Some(1)), bundle).unwrap();

        let calls = host.calls.borrow();
        assert_eq!(calls[0], "list");
        assert_eq!(calls[1], "create:18.1.8-rc1:true");
        assert!(calls[2].starts_with("upload:https://uploads.example/new:"));
    }

    #[test]
    fn test_existing_release_without_matching_asset_skips_delete() {
        let bundle = Path::new("/tmp/clang+llvm-18.1.8-aarch64.tar.xz");
        let host = MockHost {
            releases: vec![Release {
                tag_name: "18.1.8".into(),
                upload_url: "https://uploads.example/1{?name,label}".into(),
                assets: vec![Asset {
                    id: 7,
                    name: "clang+llvm-18.1.8-x86_64.tar.xz".into(),
                }],
            }],
            ..Default::default()
        };

        publish_release(&host, &spec(None), bundle).unwrap();

        let calls = host.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], "list");
        assert!(calls[1].starts_with("upload:"));
    }
}
