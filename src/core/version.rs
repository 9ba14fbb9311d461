use super::{Result, UpgradeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Build version of the code shipped in this crate.
pub const CURRENT_BUILD_VERSION: BuildVersion = BuildVersion(22000);

/// Integer tag identifying a schema/data revision.
///
/// Build versions only grow; the stored one is rewritten after every
/// successful upgrade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildVersion(pub u32);

impl BuildVersion {
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this tag falls in the half-open range `(old, new]`.
    pub fn is_between(self, old: BuildVersion, new: BuildVersion) -> bool {
        old < self && self <= new
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BuildVersion {
    fn from(version: u32) -> Self {
        Self(version)
    }
}

impl FromStr for BuildVersion {
    type Err = UpgradeError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| UpgradeError::InvalidVersion(format!("'{}': {}", s, e)))
    }
}
