//! Release naming and download URLs.
//!
//! A release candidate uses a different download path and tag suffix than
//! a tagged release, and the source tree name uses yet another token
//! (`18.1.8rc2`, no dash) than the publication tag (`18.1.8-rc2`).

const RELEASE_URL: &str = "https://github.com/llvm/llvm-project/releases/download/llvmorg-";

/// Which upstream release to build and how to name the result.
#[derive(Debug, Clone)]
pub struct ReleaseSpec {
    /// Upstream version, e.g. `18.1.8`.
    pub version: String,
    /// Release candidate number, if building a prerelease.
    pub release_candidate: Option<u32>,
}

impl ReleaseSpec {
    /// Version token used by the upstream source tree name.
    pub fn source_version(&self) -> String {
        match self.release_candidate {
            Some(rc) => format!("{}rc{}", self.version, rc),
            None => self.version.clone(),
        }
    }

    /// Version used as the publication tag and in the bundle name.
    pub fn bundle_version(&self) -> String {
        match self.release_candidate {
            Some(rc) => format!("{}-rc{}", self.version, rc),
            None => self.version.clone(),
        }
    }

    /// Base URL of the upstream release assets.
    pub fn base_url(&self) -> String {
        match self.release_candidate {
            Some(rc) => format!("{}{}-rc{}", RELEASE_URL, self.version, rc),
            None => format!("{}{}", RELEASE_URL, self.version),
        }
    }

    /// Name of the extracted source tree (and of the source archive,
    /// minus the `.tar.xz` suffix).
    pub fn source_name(&self) -> String {
        format!("llvm-project-{}.src", self.source_version())
    }

    /// Name of the bundle for a given archive label.
    pub fn bundle_name(&self, archive: &str) -> String {
        format!("clang+llvm-{}-{}", self.bundle_version(), archive)
    }

    /// Human-readable release title, e.g. `LLVM and Clang 18.1.8 RC2`.
    pub fn display_name(&self) -> String {
        match self.release_candidate {
            Some(rc) => format!("LLVM and Clang {} RC{}", self.version, rc),
            None => format!("LLVM and Clang {}", self.version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(rc: Option<u32>) -> ReleaseSpec {
        ReleaseSpec {
            version: "18.1.8".to_string(),
            release_candidate: rc,
        }
    }

    #[test]
    fn test_tagged_release() {
        let s = spec(None);
        assert_eq!(s.source_version(), "18.1.8");
        assert_eq!(s.bundle_version(), "18.1.8");
        assert_eq!(
            s.base_url(),
            "https://github.com/llvm/llvm-project/releases/download/llvmorg-18.1.8"
        );
        assert_eq!(s.source_name(), "llvm-project-18.1.8.src");
        assert_eq!(
            s.bundle_name("x86_64-unknown-linux-gnu"),
            "clang+llvm-18.1.8-x86_64-unknown-linux-gnu"
        );
    }

    #[test]
    fn test_release_candidate() {
        let s = spec(Some(2));
        // Source tree uses the rc-qualified version token without a dash.
        assert_eq!(s.source_name(), "llvm-project-18.1.8rc2.src");
        // Publication tag gets the dashed suffix.
        assert_eq!(s.bundle_version(), "18.1.8-rc2");
        assert!(s.base_url().ends_with("llvmorg-18.1.8-rc2"));
        assert_eq!(s.display_name(), "LLVM and Clang 18.1.8 RC2");
    }
}
