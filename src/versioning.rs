//! Semantic versions for schema packages.
//!
//! The major version is part of the package name (`foo.bar.v2`) and is never
//! bumped here. A candidate that adds, removes or changes declarations gets a
//! minor bump; one that only touches comments or layout gets a patch bump.

use crate::descriptor::{DescriptorSet, FileDescriptor};
use crate::error::VersionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static MAJOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.v(\d+)$").expect("valid major version pattern"));

/// `major.minor.patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SchemaVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    pub fn bump_minor(self) -> Self {
        Self::new(self.major, self.minor + 1, 0)
    }

    pub fn bump_patch(self) -> Self {
        Self::new(self.major, self.minor, self.patch + 1)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version = semver::Version::parse(s.trim())?;
        if !version.pre.is_empty() || !version.build.is_empty() {
            return Err(VersionError::Unsupported(s.to_string()));
        }
        Ok(Self::new(version.major, version.minor, version.patch))
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.to_string()
    }
}

/// Major version encoded in a package name, 1 when there is none.
pub fn major_version(package: &str) -> u64 {
    MAJOR_SUFFIX
        .captures(package)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

pub trait SchemaVersioner {
    /// Computes the version `candidate` should be published under.
    fn determine_version(
        &self,
        package: &str,
        current_version: Option<SchemaVersion>,
        current: &DescriptorSet,
        candidate: &DescriptorSet,
    ) -> SchemaVersion;
}

/// Derives versions from how the files of a package changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverSchemaVersioner;

fn package_files<'s>(
    set: &'s DescriptorSet,
    package: &str,
) -> BTreeMap<&'s str, &'s FileDescriptor> {
    set.files()
        .filter(|f| f.package == package)
        .map(|f| (f.name.as_str(), f))
        .collect()
}

impl SchemaVersioner for SemverSchemaVersioner {
    fn determine_version(
        &self,
        package: &str,
        current_version: Option<SchemaVersion>,
        current: &DescriptorSet,
        candidate: &DescriptorSet,
    ) -> SchemaVersion {
        let major = major_version(package);
        let Some(current_version) = current_version else {
            tracing::debug!(package, major, "no published version");
            return SchemaVersion::new(major, 0, 0);
        };
        if current_version.major != major {
            tracing::warn!(
                package,
                stored = %current_version,
                major,
                "stored major version does not match package name"
            );
        }
        let base = SchemaVersion::new(major, current_version.minor, current_version.patch);

        let before = package_files(current, package);
        let after = package_files(candidate, package);

        let declarations_changed = !before.keys().eq(after.keys())
            || before.iter().any(|(name, file)| {
                after.get(name).is_some_and(|c| {
                    file.proto_without_source_info() != c.proto_without_source_info()
                })
            });
        let next = if declarations_changed {
            base.bump_minor()
        } else if before
            .iter()
            .any(|(name, file)| after.get(name).is_some_and(|c| file.proto != c.proto))
        {
            base.bump_patch()
        } else {
            base
        };
        tracing::info!(package, from = %current_version, to = %next, "determined version");
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let version: SchemaVersion = "2.3.12".parse().unwrap();
        assert_eq!(version, SchemaVersion::new(2, 3, 12));
        assert_eq!(version.to_string(), "2.3.12");
    }

    #[test]
    fn test_rejects_pre_release() {
        assert!(matches!(
            "1.0.0-alpha".parse::<SchemaVersion>(),
            Err(VersionError::Unsupported(_))
        ));
        assert!(matches!("1.0".parse::<SchemaVersion>(), Err(VersionError::Semver(_))));
    }

    #[test]
    fn test_major_from_package() {
        assert_eq!(major_version("foo.bar"), 1);
        assert_eq!(major_version("foo.bar.v2"), 2);
        assert_eq!(major_version("foo.v3.bar"), 1);
        assert_eq!(major_version("foo.barv2"), 1);
        assert_eq!(major_version(""), 1);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&SchemaVersion::new(1, 4, 0)).unwrap();
        assert_eq!(json, "\"1.4.0\"");
        let back: SchemaVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SchemaVersion::new(1, 4, 0));
    }

    #[test]
    fn test_unchanged_sets_keep_version() {
        let set = DescriptorSet::empty();
        let version = SchemaVersion::new(1, 2, 3);
        assert_eq!(
            SemverSchemaVersioner.determine_version("foo.bar", Some(version), &set, &set),
            version
        );
    }
}
