use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

lazy_static! {
    static ref VERSION_PATTERN: Regex =
        Regex::new(r"v([0-9]+)\.([0-9]+)\.([0-9]+)").expect("Version pattern is valid");
}

/// First release with the `-C` (check) command
const CHECK_SINCE: Version = Version::new(1, 4, 11);

/// First release with the `--wait` flag
const WAIT_SINCE: Version = Version::new(1, 4, 20);

/// Ordered lexicographically by (major, minor, patch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Rules can be tested with `-C`
    pub check: bool,

    /// The tool serializes itself against other instances when passed `--wait`
    pub wait: bool,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extracts the first `v<major>.<minor>.<patch>` found in `text`,
    /// e.g. "iptables v1.8.7 (nf_tables)" yields 1.8.7.
    pub fn extract(text: &str) -> Result<Self> {
        let captures = VERSION_PATTERN
            .captures(text)
            .ok_or_else(|| Error::VersionNotFound(text.trim_end().to_string()))?;

        let component = |index: usize| {
            let digits = &captures[index];
            digits.parse::<u32>().map_err(|source| Error::InvalidVersion {
                component: digits.to_string(),
                source,
            })
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Capabilities {
    pub fn of(version: Version) -> Self {
        Self {
            check: version >= CHECK_SINCE,
            wait: version >= WAIT_SINCE,
        }
    }
}

/// Runs `<path> --version` and extracts the version from its output.
///
/// This bypasses the xtables lock: the version query does not touch the ruleset.
pub fn probe(path: &Path) -> Result<Version> {
    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::Spawn {
            program: path.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::exit(output.status, &output.stderr));
    }

    Version::extract(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iptables::tests::{Behavior, FakeTool};
    use assert_matches::assert_matches;

    #[test]
    fn extract_from_free_form_text() {
        assert_eq!(
            Version::extract("iptables v1.3.66").unwrap(),
            Version::new(1, 3, 66)
        );
        assert_eq!(
            Version::extract("ip6tables v1.8.7 (nf_tables)\n").unwrap(),
            Version::new(1, 8, 7)
        );
    }

    #[test]
    fn extract_uses_first_match() {
        assert_eq!(
            Version::extract("iptables v1.4.21, libxtables v12.0.0").unwrap(),
            Version::new(1, 4, 21)
        );
    }

    #[test]
    fn extract_fails_without_pattern() {
        assert_matches!(
            Version::extract("iptables version unknown"),
            Err(Error::VersionNotFound(s)) if s == "iptables version unknown"
        );
        assert_matches!(
            Version::extract("iptables v1.4"),
            Err(Error::VersionNotFound(_))
        );
        assert_matches!(Version::extract(""), Err(Error::VersionNotFound(_)));
    }

    #[test]
    fn extract_rejects_oversized_components() {
        assert_matches!(
            Version::extract("iptables v1.4.99999999999"),
            Err(Error::InvalidVersion { component, .. }) if component == "99999999999"
        );
    }

    #[test]
    fn check_threshold() {
        let check = |major, minor, patch| Capabilities::of(Version::new(major, minor, patch)).check;

        assert!(!check(0, 9, 99));
        assert!(!check(1, 3, 66));
        assert!(!check(1, 4, 10));
        assert!(check(1, 4, 11));
        assert!(check(1, 4, 12));
        assert!(check(1, 5, 0));
        assert!(check(2, 0, 0));
    }

    #[test]
    fn wait_threshold() {
        let wait = |major, minor, patch| Capabilities::of(Version::new(major, minor, patch)).wait;

        assert!(!wait(1, 4, 11));
        assert!(!wait(1, 4, 19));
        assert!(wait(1, 4, 20));
        assert!(wait(1, 4, 21));
        assert!(wait(1, 6, 1));
        assert!(wait(3, 0, 0));
    }

    #[test]
    fn display() {
        assert_eq!(Version::new(1, 8, 10).to_string(), "v1.8.10");
    }

    #[test]
    fn probe_fake_tool() {
        let tool = FakeTool::install("v1.6.1", Behavior::default());

        assert_eq!(probe(tool.path()).unwrap(), Version::new(1, 6, 1));
        // The version query itself is not logged as a ruleset invocation
        assert!(tool.invocations().is_empty());
        assert!(!tool.lock_file().exists());
    }

    #[test]
    fn probe_missing_binary() {
        let dir = tempfile::tempdir().unwrap();

        assert_matches!(
            probe(&dir.path().join("iptables")),
            Err(Error::Spawn { .. })
        );
    }
}
