use super::path::SlotPath;
use ahash::AHashMap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\}").expect("placeholder pattern is valid")
});

/// Per-session values of extracted slots.
///
/// A path absent from the store is unfilled. Values are never empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStore {
    values: AHashMap<SlotPath, String>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &SlotPath) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    /// Looks a value up by its dotted path string.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        SlotPath::parse(path).ok().and_then(|p| self.get(&p))
    }

    pub fn contains(&self, path: &SlotPath) -> bool {
        self.values.contains_key(path)
    }

    /// Stores `value` at `path`, overwriting any previous value. Empty values are ignored.
    pub fn set(&mut self, path: SlotPath, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        self.values.insert(path, value);
        true
    }

    pub fn remove(&mut self, path: &SlotPath) -> Option<String> {
        self.values.remove(path)
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotPath, &str)> {
        self.values.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Replaces `{dotted.path}` placeholders with filled slot values.
    /// Placeholders of unfilled or unknown slots are left as written.
    pub fn fill_template(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                self.get_str(&caps[1])
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
