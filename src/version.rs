//! Lenient dotted version numbers.
//!
//! Shared-library symbol versions (GLIBC_2.17, GLIBCXX_3.4) are not valid
//! semver, so this is a plain numeric triple: missing components are zero.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;

/// A (major, minor, patch) version. Ordering is numeric, major first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');

        let major = match parts.next() {
            Some(p) if !p.is_empty() => parse_component(p)?,
            _ => bail!("empty version string"),
        };
        let minor = parts.next().map(parse_component).transpose()?.unwrap_or(0);
        let patch = parts.next().map(parse_component).transpose()?.unwrap_or(0);

        Ok(Version {
            major,
            minor,
            patch,
        })
    }
}

fn parse_component(part: &str) -> Result<u32> {
    part.parse()
        .with_context(|| format!("invalid version component '{part}'"))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_missing_components_default_to_zero() {
        assert_eq!(
            v("10"),
            Version {
                major: 10,
                minor: 0,
                patch: 0
            }
        );
        assert_eq!(v("10.1"), v("10.1.0"));
        assert_eq!(
            v("2.17"),
            Version {
                major: 2,
                minor: 17,
                patch: 0
            }
        );
    }

    #[test]
    fn test_ordering_is_numeric_not_lexicographic() {
        // "10" < "9" as strings, but not as versions
        assert!(v("10.0.0") > v("9.10.0"));
        assert!(v("3.4.9") < v("3.4.29"));
        assert!(v("2.2.5") < v("2.17"));
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(v("18.1").to_string(), "18.1.0");
        assert_eq!(v("3.4.29").to_string(), "3.4.29");
    }

    #[test]
    fn test_invalid_strings_fail() {
        assert!("".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
        assert!("abc".parse::<Version>().is_err());
    }
}
