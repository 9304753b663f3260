//! Fragment merge logic
//!
//! Merge semantics, applied per key of the overlay:
//! - Mappings: deep-merge by key (recursive)
//! - Sequences: concatenate, then drop duplicates (first occurrence wins)
//! - Strings: URIs replace; concatenating keys comma-join; otherwise replace
//! - Anything else, or mismatched types: overlay wins

use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

/// Keys whose string values are comma-separated lists by default
pub const DEFAULT_CONCAT_KEYS: &[&str] = &["NO_PROXY", "no_proxy", "OTEL_RESOURCE_ATTRIBUTES"];

/// A string containing this marker is a URI and never comma-joined
const URI_MARKER: &str = "://";

/// Merge rules shared by every stage of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    concat_keys: BTreeSet<String>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CONCAT_KEYS.iter().copied())
    }
}

impl MergePolicy {
    /// Create a policy with the given concatenating keys
    pub fn new<I, S>(concat_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            concat_keys: concat_keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_concat_key(&self, key: &str) -> bool {
        self.concat_keys.contains(key)
    }

    /// Merge `overlay` onto a copy of `base`, leaving both inputs untouched
    pub fn merge(&self, base: &Value, overlay: &Value) -> Value {
        let mut merged = deep_copy(base);
        self.merge_into(&mut merged, overlay);
        merged
    }

    /// Merge `overlay` into a caller-owned `base`
    pub fn merge_into(&self, base: &mut Value, overlay: &Value) {
        self.merge_value(None, base, overlay);
    }

    /// Merge two mappings key by key
    pub fn merge_mapping(&self, base: &mut Mapping, overlay: &Mapping) {
        for (key, value) in overlay {
            match base.get_mut(key) {
                Some(existing) => self.merge_value(key.as_str(), existing, value),
                None => {
                    base.insert(key.clone(), deep_copy(value));
                }
            }
        }
    }

    /// Combine two strings found under `key`
    pub fn merge_strings(&self, key: Option<&str>, base: &str, overlay: &str) -> String {
        if base.contains(URI_MARKER) || overlay.contains(URI_MARKER) {
            return overlay.to_string();
        }

        match key {
            Some(key) if self.is_concat_key(key) => join_unique(base, overlay),
            _ => overlay.to_string(),
        }
    }

    fn merge_value(&self, key: Option<&str>, base: &mut Value, overlay: &Value) {
        match (base, overlay) {
            (Value::Mapping(base), Value::Mapping(overlay)) => self.merge_mapping(base, overlay),
            (Value::Sequence(base), Value::Sequence(overlay)) => append_unique(base, overlay),
            (Value::String(base), Value::String(overlay)) => {
                *base = self.merge_strings(key, base, overlay);
            }
            (base, overlay) => *base = deep_copy(overlay),
        }
    }
}

/// Independent copy of a value tree.
///
/// `serde_yaml` values own all of their children, so a clone is a full
/// structural copy with no sharing between the two owners.
pub fn deep_copy(value: &Value) -> Value {
    value.clone()
}

/// Append `extra` to `items`, then drop duplicates keeping the first occurrence
pub fn append_unique(items: &mut Vec<Value>, extra: &[Value]) {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len() + extra.len());
    for item in items.drain(..).chain(extra.iter().cloned()) {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    *items = unique;
}

/// Comma-join `overlay` onto `base`, skipping parts `base` already lists
fn join_unique(base: &str, overlay: &str) -> String {
    let mut parts: Vec<&str> = base
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut changed = false;
    for part in overlay.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !parts.contains(&part) {
            parts.push(part);
            changed = true;
        }
    }

    if changed {
        parts.join(",")
    } else if base.is_empty() {
        overlay.to_string()
    } else {
        base.to_string()
    }
}
