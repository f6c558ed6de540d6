use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical address of a slot or slot group: dot-separated segments such as
/// `person.programmer.username`.
///
/// Extraction writes and condition reads use the same path type, so a path
/// that resolves at load time addresses the same store entry at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotPath(String);

pub const SEPARATOR: char = '.';

impl SlotPath {
    /// Parses a dotted path, rejecting empty paths and empty segments.
    pub fn parse(path: &str) -> Result<Self, String> {
        let path = path.trim();
        if path.is_empty() {
            return Err("slot path is empty".to_string());
        }
        if path.split(SEPARATOR).any(|segment| segment.trim().is_empty()) {
            return Err(format!("slot path '{}' has an empty segment", path));
        }
        Ok(Self(path.to_string()))
    }

    /// Appends one segment; `segment` must not contain the separator.
    pub(crate) fn child(&self, segment: &str) -> Self {
        Self(format!("{}{}{}", self.0, SEPARATOR, segment))
    }

    pub(crate) fn root(segment: &str) -> Self {
        Self(segment.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &SlotPath) -> bool {
        other.0 == self.0
            || (other.0.len() > self.0.len()
                && other.0.starts_with(&self.0)
                && other.0[self.0.len()..].starts_with(SEPARATOR))
    }
}

impl fmt::Display for SlotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SlotPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_segments() {
        assert!(SlotPath::parse("").is_err());
        assert!(SlotPath::parse("person..username").is_err());
        assert!(SlotPath::parse(".person").is_err());
        assert!(SlotPath::parse("person.programmer.username").is_ok());
    }

    #[test]
    fn containment_respects_segment_boundaries() {
        let group = SlotPath::parse("person.programmer").unwrap();
        let leaf = SlotPath::parse("person.programmer.email").unwrap();
        let lookalike = SlotPath::parse("person.programmers.email").unwrap();
        assert!(group.contains(&leaf));
        assert!(group.contains(&group));
        assert!(!group.contains(&lookalike));
        assert!(!leaf.contains(&group));
    }
}
