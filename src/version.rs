//! Semantic `(major, minor)` version pairs used to evolve molds and configs.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DisirError, DisirResult};

/// A `(major, minor)` version pair.
///
/// Versions compare lexicographically: `(1, 9) < (2, 0)`. The default for
/// any unset version is `(1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }

    /// Parses `"M.m"`, tolerating trailing garbage after the minor
    /// component only once the minor itself parsed successfully
    /// (e.g. `"1.0-rc1"` parses to `(1, 0)`, but `"1."` is invalid).
    pub fn parse(input: &str) -> DisirResult<Self> {
        let mut parts = input.splitn(2, '.');
        let major_str = parts.next().unwrap_or("");
        let rest = parts.next().ok_or_else(|| {
            DisirError::InvalidArgument(format!("version missing '.': {input:?}"))
        })?;

        let major: u32 = major_str
            .parse()
            .map_err(|_| DisirError::InvalidArgument(format!("bad major version: {input:?}")))?;

        // Consume the leading run of ASCII digits as the minor component;
        // anything after that is tolerated garbage.
        let digit_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digit_len == 0 {
            return Err(DisirError::InvalidArgument(format!(
                "bad minor version: {input:?}"
            )));
        }
        let minor: u32 = rest[..digit_len]
            .parse()
            .map_err(|_| DisirError::InvalidArgument(format!("bad minor version: {input:?}")))?;

        Ok(Version { major, minor })
    }

    pub fn format(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn compare(a: &Version, b: &Version) -> Ordering {
        a.cmp(b)
    }

    pub fn set(&mut self, other: &Version) {
        self.major = other.major;
        self.minor = other.minor;
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::new(1, 0)
    }
}

/// Resolves the entry "active" at `version` out of a set of
/// version-introduced entries: the one with the greatest `introduced <=
/// version`, falling back to the overall-greatest entry if none
/// qualifies. Used identically by documentation, defaults and
/// restrictions (§4.6-4.8).
pub fn active_at<'a, T, F>(entries: &'a [T], version: &Version, introduced: F) -> Option<&'a T>
where
    F: Fn(&T) -> Version,
{
    let eligible = entries
        .iter()
        .filter(|e| introduced(e) <= *version)
        .max_by_key(|e| introduced(e));

    eligible.or_else(|| entries.iter().max_by_key(|e| introduced(e)))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
