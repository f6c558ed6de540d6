use super::path::{SEPARATOR, SlotPath};
use super::store::SlotStore;
use crate::error::ConfigError;
use crate::script::SlotDefinition;
use ahash::AHashMap;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::trace;

/// A leaf slot filled by a regular expression capture.
#[derive(Debug, Clone)]
pub struct RegexpSlot {
    pub path: SlotPath,
    pub regex: Regex,
    /// Capture group written to the store; 0 is the whole match.
    pub match_group_idx: usize,
}

impl RegexpSlot {
    /// Runs the expression against `text` and returns the selected capture, if any.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(self.match_group_idx))
            .map(|m| m.as_str())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone)]
enum SlotEntry {
    Leaf(usize),
    Group(Vec<usize>),
}

/// The extractor registry: every slot definition of a script, compiled and
/// addressable by path.
///
/// A leaf path addresses one `RegexpSlot`; a group path addresses every leaf
/// beneath it, so siblings stay independently extractable.
#[derive(Debug, Clone, Default)]
pub struct SlotSchema {
    leaves: Vec<RegexpSlot>,
    index: AHashMap<SlotPath, SlotEntry>,
}

impl SlotSchema {
    /// Compiles a slot tree. Every regular expression is validated here.
    pub fn from_definitions(
        definitions: &BTreeMap<String, SlotDefinition>,
    ) -> Result<Self, ConfigError> {
        let mut schema = SlotSchema::default();
        for (name, definition) in definitions {
            validate_name(name, "<root>")?;
            schema.add(SlotPath::root(name), definition)?;
        }
        Ok(schema)
    }

    /// Adds `definition` at `path` and returns the indices of the leaves it holds.
    fn add(&mut self, path: SlotPath, definition: &SlotDefinition) -> Result<Vec<usize>, ConfigError> {
        let leaves = match definition {
            SlotDefinition::Regexp(leaf) => {
                let regex = Regex::new(&leaf.regexp).map_err(|e| ConfigError::InvalidRegex {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
                if leaf.match_group_idx >= regex.captures_len() {
                    return Err(ConfigError::InvalidRegex {
                        path: path.to_string(),
                        message: format!(
                            "capture group {} does not exist, the expression has {} group(s)",
                            leaf.match_group_idx,
                            regex.captures_len() - 1
                        ),
                    });
                }
                let idx = self.leaves.len();
                self.leaves.push(RegexpSlot {
                    path: path.clone(),
                    regex,
                    match_group_idx: leaf.match_group_idx,
                });
                self.index.insert(path, SlotEntry::Leaf(idx));
                vec![idx]
            }
            SlotDefinition::Group(children) => {
                if children.is_empty() {
                    return Err(ConfigError::EmptySlotGroup(path.to_string()));
                }
                let mut leaves = Vec::new();
                for (name, child) in children {
                    validate_name(name, path.as_str())?;
                    leaves.extend(self.add(path.child(name), child)?);
                }
                self.index.insert(path, SlotEntry::Group(leaves.clone()));
                leaves
            }
        };
        Ok(leaves)
    }

    pub fn contains(&self, path: &SlotPath) -> bool {
        self.index.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// All leaf slots in definition order.
    pub fn leaves(&self) -> &[RegexpSlot] {
        &self.leaves
    }

    fn leaf_indices(&self, path: &SlotPath) -> &[usize] {
        match self.index.get(path) {
            Some(SlotEntry::Leaf(idx)) => std::slice::from_ref(idx),
            Some(SlotEntry::Group(indices)) => indices,
            None => &[],
        }
    }

    /// Extracts the slot (or every slot of the group) at `path` from `text`.
    ///
    /// A match overwrites the stored value of that path; a miss leaves the
    /// store untouched. Returns the number of slots written.
    pub fn extract(&self, store: &mut SlotStore, path: &SlotPath, text: Option<&str>) -> usize {
        let Some(text) = text else {
            trace!(slot = %path, "no request text, skipping extraction");
            return 0;
        };
        self.leaf_indices(path)
            .iter()
            .map(|&idx| self.extract_leaf(store, &self.leaves[idx], text))
            .filter(|written| *written)
            .count()
    }

    /// Extracts every leaf slot of the schema.
    pub fn extract_all(&self, store: &mut SlotStore, text: Option<&str>) -> usize {
        let Some(text) = text else {
            return 0;
        };
        self.leaves
            .iter()
            .map(|leaf| self.extract_leaf(store, leaf, text))
            .filter(|written| *written)
            .count()
    }

    fn extract_leaf(&self, store: &mut SlotStore, leaf: &RegexpSlot, text: &str) -> bool {
        match leaf.capture(text) {
            Some(value) => {
                trace!(slot = %leaf.path, value, "slot extracted");
                store.set(leaf.path.clone(), value)
            }
            None => {
                trace!(slot = %leaf.path, "slot not matched");
                false
            }
        }
    }

    /// A leaf is filled when it holds a value; a group when all of its leaves do.
    pub fn is_filled(&self, store: &SlotStore, path: &SlotPath) -> bool {
        match self.index.get(path) {
            Some(SlotEntry::Group(indices)) => indices
                .iter()
                .all(|&idx| store.contains(&self.leaves[idx].path)),
            _ => store.contains(path),
        }
    }

    /// Clears the slot (or every slot of the group) at `path`.
    pub fn unset(&self, store: &mut SlotStore, path: &SlotPath) {
        match self.index.get(path) {
            Some(SlotEntry::Group(indices)) => {
                for &idx in indices {
                    store.remove(&self.leaves[idx].path);
                }
            }
            _ => {
                store.remove(path);
            }
        }
    }

    pub fn unset_all(&self, store: &mut SlotStore) {
        store.clear();
    }
}

fn validate_name(name: &str, parent: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && !name.contains(SEPARATOR)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidSlotName {
            name: name.to_string(),
            parent: parent.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SlotSchema {
        let definitions: BTreeMap<String, SlotDefinition> = serde_json::from_value(json!({
            "person": {
                "programmer": {
                    "username": { "regexp": "username is ([a-zA-Z]+)", "match_group_idx": 1 },
                    "email": { "regexp": "email is ([a-z@\\.A-Z]+)", "match_group_idx": 1 }
                }
            },
            "number": { "regexp": "[0-9]+" }
        }))
        .unwrap();
        SlotSchema::from_definitions(&definitions).unwrap()
    }

    fn path(p: &str) -> SlotPath {
        SlotPath::parse(p).unwrap()
    }

    #[test]
    fn extracts_capture_group_into_leaf() {
        let schema = schema();
        let mut store = SlotStore::new();
        let written = schema.extract(
            &mut store,
            &path("person.programmer.username"),
            Some("username is bob"),
        );
        assert_eq!(written, 1);
        assert_eq!(store.get_str("person.programmer.username"), Some("bob"));
        assert!(!store.contains(&path("person.programmer.email")));
    }

    #[test]
    fn default_group_index_stores_whole_match() {
        let schema = schema();
        let mut store = SlotStore::new();
        schema.extract(&mut store, &path("number"), Some("table for 4 please"));
        assert_eq!(store.get_str("number"), Some("4"));
    }

    #[test]
    fn miss_keeps_previous_value() {
        let schema = schema();
        let mut store = SlotStore::new();
        let username = path("person.programmer.username");
        schema.extract(&mut store, &username, Some("username is bob"));
        assert_eq!(schema.extract(&mut store, &username, Some("hello")), 0);
        assert_eq!(store.get(&username), Some("bob"));
    }

    #[test]
    fn group_extraction_and_fill_state() {
        let schema = schema();
        let mut store = SlotStore::new();
        let group = path("person.programmer");
        schema.extract(&mut store, &group, Some("username is bob"));
        assert!(!schema.is_filled(&store, &group));
        schema.extract(&mut store, &group, Some("my email is a@b.com"));
        assert!(schema.is_filled(&store, &group));
        assert_eq!(store.get_str("person.programmer.username"), Some("bob"));

        schema.unset(&mut store, &group);
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_missing_capture_group() {
        let definitions: BTreeMap<String, SlotDefinition> =
            serde_json::from_value(json!({ "name": { "regexp": "name", "match_group_idx": 2 } })).unwrap();
        let err = SlotSchema::from_definitions(&definitions).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));
    }

    #[test]
    fn rejects_broken_expression() {
        let definitions: BTreeMap<String, SlotDefinition> =
            serde_json::from_value(json!({ "name": { "regexp": "(unclosed" } })).unwrap();
        assert!(matches!(
            SlotSchema::from_definitions(&definitions),
            Err(ConfigError::InvalidRegex { .. })
        ));
    }
}
