//! # Entry Identity
//!
//! A configuration entry is named `domain:name`, e.g. `demo:conn_local`.
//!
//! - whitespace anywhere in the full name is dropped
//! - the split happens on the last `:`; no `:` means an empty domain
//! - the domain is normalised: `\` becomes `/`, surrounding slashes are
//!   trimmed, letters are lowercased; it must then be a single path segment
//! - the name must be non-empty and free of `,` `.` `/` and `:`
//!
//! Identity is fixed for the lifetime of a register.

use crate::StagehandError;
use crate::template::Tokens;
use std::str::FromStr;

/// Characters an entry name (and normalised domain) may not contain.
const FORBIDDEN: [char; 4] = [',', '.', '/', ':'];

/// A `(domain, name)` pair identifying one configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entry {
    domain: String,
    name: String,
}

impl Entry {
    /// Build an entry from separate parts.
    pub fn new(domain: &str, name: &str) -> Result<Self, StagehandError> {
        let domain = domain
            .replace('\\', "/")
            .trim_matches('/')
            .to_lowercase();
        let name = name.to_string();

        if name.is_empty() {
            return Err(StagehandError::InvalidName(
                "entry name must not be empty".to_string(),
            ));
        }
        if name.contains(FORBIDDEN) {
            return Err(StagehandError::InvalidName(format!(
                "entry name {name:?} must not contain any of , . / :"
            )));
        }
        if domain.contains(FORBIDDEN) {
            return Err(StagehandError::InvalidName(format!(
                "domain {domain:?} must be a single segment without any of , . / :"
            )));
        }
        Ok(Self { domain, name })
    }

    /// Parse `domain:name` (or a bare `name`).
    pub fn parse(fullname: &str) -> Result<Self, StagehandError> {
        let compact: String = fullname.split_whitespace().collect();
        match compact.rsplit_once(':') {
            Some((domain, name)) => Self::new(domain, name),
            None => Self::new("", &compact),
        }
    }

    /// Get the normalised domain (may be empty).
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Get the entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `domain:name`, or `name` when the domain is empty.
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.domain.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.domain, self.name)
        }
    }

    /// First letter of each `_`-separated word of the name.
    #[must_use]
    pub fn shortname(&self) -> String {
        self.name
            .split('_')
            .filter_map(|word| word.chars().next())
            .collect()
    }

    /// File name of the change-detection record for `stage`.
    #[must_use]
    pub fn metadata_key(&self, stage: &str) -> String {
        if self.domain.is_empty() {
            format!("{}.{stage}.json", self.name)
        } else {
            format!("{}.{}.{stage}.json", self.domain, self.name)
        }
    }

    /// Tokens that pin a template matcher to this entry's files.
    #[must_use]
    pub fn pinned_tokens(&self) -> Tokens {
        Tokens {
            naming: Some(self.name.clone()),
            domain: Some(self.domain.clone()),
            ..Tokens::default()
        }
    }
}

impl FromStr for Entry {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fullname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_last_colon() {
        let entry = Entry::parse(" Demo : conn_local ").expect("parse");
        assert_eq!(entry.domain(), "demo");
        assert_eq!(entry.name(), "conn_local");
        assert_eq!(entry.fullname(), "demo:conn_local");
    }

    #[test]
    fn bare_name_has_empty_domain() {
        let entry = Entry::parse("conn").expect("parse");
        assert_eq!(entry.domain(), "");
        assert_eq!(entry.fullname(), "conn");
        assert_eq!(entry.metadata_key("raw"), "conn.raw.json");
    }

    #[test]
    fn domain_is_normalised() {
        let entry = Entry::new("\\Demo/", "conn").expect("new");
        assert_eq!(entry.domain(), "demo");
        assert_eq!(entry.metadata_key("raw"), "demo.conn.raw.json");
    }

    #[test]
    fn invalid_names_rejected() {
        for bad in ["demo:conn.local", "demo:a,b", "demo:", "", "a/b:conn", "a.b:conn"] {
            assert!(
                matches!(Entry::parse(bad), Err(StagehandError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn shortname_takes_word_initials() {
        let entry = Entry::parse("demo:conn_local_file").expect("parse");
        assert_eq!(entry.shortname(), "clf");
    }
}
