//! Common types used across distbuild

use std::fmt;

use serde::{Deserialize, Serialize};

/// A package name paired with a version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageVer {
    /// Package name
    pub name: String,
    /// Package version (e.g. "1.2.3-4")
    pub version: String,
}

impl PackageVer {
    /// Create a new versioned package
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Packages that must never be built or tested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreList {
    packages: Vec<PackageVer>,
}

impl IgnoreList {
    /// Create an ignore list from a set of packages
    pub fn new(packages: Vec<PackageVer>) -> Self {
        Self { packages }
    }

    /// Exact match on both name and version
    pub fn contains(&self, pkg: &PackageVer) -> bool {
        self.packages.iter().any(|p| p == pkg)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<PackageVer> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = PackageVer>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
