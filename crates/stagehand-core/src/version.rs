//! # Version Policy
//!
//! Three-component versions and the rule that advances them.
//!
//! | Change level        | Bump                                 |
//! |---------------------|--------------------------------------|
//! | `None`              | unchanged                            |
//! | `ValueChanged`      | patch + 1                            |
//! | `StructureChanged`  | minor + 1, patch reset               |
//! | at/above `breaking` | major + 1, minor and patch reset     |
//! | `NoPriorMetadata`   | unchanged (the caller always promotes) |

use crate::{ChangeLevel, StagehandError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// VERSION
// =============================================================================

/// A `(major, minor, patch)` version, totally ordered field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Next major version; minor and patch reset to zero.
    #[must_use]
    pub const fn bump_major(self) -> Self {
        Self::new(self.major.saturating_add(1), 0, 0)
    }

    /// Next minor version; patch resets to zero.
    #[must_use]
    pub const fn bump_minor(self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1), 0)
    }

    /// Next patch version.
    #[must_use]
    pub const fn bump_patch(self) -> Self {
        Self::new(self.major, self.minor, self.patch.saturating_add(1))
    }

    /// The `v`-prefixed form stored in the `version` bookkeeping field.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("v{self}")
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(0, 0, 1)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = StagehandError;

    /// Parse `1.2.3` or `v1.2.3`. Anything else is `InvalidVersion`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StagehandError::InvalidVersion(s.to_string());
        let body = s.strip_prefix('v').unwrap_or(s);

        let mut parts = body.split('.');
        let mut next = || -> Result<u64, StagehandError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// VERSION POLICY
// =============================================================================

/// Maps a change level onto a version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionPolicy {
    /// Levels at or above this one bump the major component.
    ///
    /// `None` (the default) means no level is breaking, so structural changes
    /// alone only bump the minor component.
    breaking: Option<ChangeLevel>,
}

impl VersionPolicy {
    /// Policy without a breaking threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self { breaking: None }
    }

    /// Policy that bumps the major component at or above `level`.
    #[must_use]
    pub const fn with_breaking(level: ChangeLevel) -> Self {
        Self {
            breaking: Some(level),
        }
    }

    /// Get the breaking threshold, if any.
    #[must_use]
    pub const fn breaking(&self) -> Option<ChangeLevel> {
        self.breaking
    }

    /// Advance `current` according to `level`.
    ///
    /// `NoPriorMetadata` never bumps: with nothing recorded there is nothing
    /// to advance from.
    #[must_use]
    pub fn bump(&self, current: Version, level: ChangeLevel) -> Version {
        match level {
            ChangeLevel::None | ChangeLevel::NoPriorMetadata => current,
            _ if self.breaking.is_some_and(|b| level >= b) => current.bump_major(),
            ChangeLevel::StructureChanged => current.bump_minor(),
            ChangeLevel::ValueChanged => current.bump_patch(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_0_0_1() {
        assert_eq!(Version::default(), Version::new(0, 0, 1));
        assert_eq!(Version::default().tag(), "v0.0.1");
    }

    #[test]
    fn parse_accepts_leading_v() {
        assert_eq!("v1.2.3".parse::<Version>().expect("parse"), Version::new(1, 2, 3));
        assert_eq!("10.0.7".parse::<Version>().expect("parse"), Version::new(10, 0, 7));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "v", "1.2", "1.2.3.4", "x1.2.3", "1.-2.3", "1.+2.3", "1..3", "V1.2.3"] {
            let result = bad.parse::<Version>();
            assert!(
                matches!(result, Err(StagehandError::InvalidVersion(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn ordering_is_field_by_field() {
        assert!(Version::new(0, 0, 9) < Version::new(0, 1, 0));
        assert!(Version::new(0, 9, 9) < Version::new(1, 0, 0));
        assert!(Version::new(1, 2, 3) == Version::new(1, 2, 3));
    }

    #[test]
    fn bump_follows_change_level() {
        let policy = VersionPolicy::new();
        let v = Version::new(1, 2, 3);

        assert_eq!(policy.bump(v, ChangeLevel::None), v);
        assert_eq!(policy.bump(v, ChangeLevel::ValueChanged), Version::new(1, 2, 4));
        assert_eq!(policy.bump(v, ChangeLevel::StructureChanged), Version::new(1, 3, 0));
        assert_eq!(policy.bump(v, ChangeLevel::NoPriorMetadata), v);
    }

    #[test]
    fn breaking_threshold_bumps_major() {
        let policy = VersionPolicy::with_breaking(ChangeLevel::StructureChanged);
        let v = Version::new(1, 2, 3);

        assert_eq!(policy.bump(v, ChangeLevel::StructureChanged), Version::new(2, 0, 0));
        assert_eq!(policy.bump(v, ChangeLevel::ValueChanged), Version::new(1, 2, 4));
        assert_eq!(policy.bump(v, ChangeLevel::NoPriorMetadata), v);
    }

    #[test]
    fn serde_uses_tag_form() {
        let json = serde_json::to_string(&Version::new(0, 3, 1)).expect("serialize");
        assert_eq!(json, "\"v0.3.1\"");
        let back: Version = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Version::new(0, 3, 1));
    }
}
