//! Component declarations and the records produced by resolution
//!
//! A [`Component`] is pure data (name, children, profiles, overrides,
//! modifications) plus a [`ComponentSource`] that lazily supplies the
//! fragment, extra children and wire rules.

use serde_yaml::{Mapping, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::SourceError;

/// Capabilities bound to a component by whoever loaded it.
///
/// Every method is optional. A source that returns `Ok(None)` from
/// [`load_fragment`](Self::load_fragment) has no fragment, which fails the
/// resolution if the component is included.
pub trait ComponentSource: fmt::Debug + Send + Sync {
    /// Base fragment document of the component
    fn load_fragment(&self) -> Result<Option<Value>, SourceError> {
        Ok(None)
    }

    /// Children discovered from the source itself (appended after declared children)
    fn export_children(&self) -> Result<Vec<Component>, SourceError> {
        Ok(Vec::new())
    }

    /// Wire rules, computed once the full set of resolved components is known
    fn export_wire_rules(
        &self,
        _present: &PresentComponents<'_>,
    ) -> Result<Option<WireRuleSet>, SourceError> {
        Ok(None)
    }
}

/// Source backed by in-memory documents
#[derive(Debug, Clone, Default)]
pub struct InlineSource {
    fragment: Option<Value>,
    wire_rules: Option<WireRuleSet>,
}

impl InlineSource {
    pub fn new(fragment: Value) -> Self {
        Self {
            fragment: Some(fragment),
            wire_rules: None,
        }
    }

    /// Source that has no fragment
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_wire_rules(mut self, rules: WireRuleSet) -> Self {
        self.wire_rules = Some(rules);
        self
    }
}

impl ComponentSource for InlineSource {
    fn load_fragment(&self) -> Result<Option<Value>, SourceError> {
        Ok(self.fragment.clone())
    }

    fn export_wire_rules(
        &self,
        _present: &PresentComponents<'_>,
    ) -> Result<Option<WireRuleSet>, SourceError> {
        Ok(self.wire_rules.clone())
    }
}

/// An override patch aimed at another component
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    /// Name of the component to patch; `None` is a configuration error
    pub target: Option<String>,
    pub patch: Value,
}

impl Modification {
    pub fn new(target: impl Into<String>, patch: Value) -> Self {
        Self {
            target: Some(target.into()),
            patch,
        }
    }
}

/// A named unit of configuration with declared dependencies
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub children: Vec<Component>,
    pub profiles: Vec<String>,
    pub labels: Mapping,
    pub overrides: Value,
    pub modifications: Vec<Modification>,
    pub is_local: bool,
    pub source: Arc<dyn ComponentSource>,
}

impl Component {
    pub fn new(name: impl Into<String>, source: Arc<dyn ComponentSource>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            profiles: Vec::new(),
            labels: Mapping::new(),
            overrides: Value::Mapping(Mapping::new()),
            modifications: Vec::new(),
            is_local: false,
            source,
        }
    }

    /// Component whose fragment is held in memory
    pub fn inline(name: impl Into<String>, fragment: Value) -> Self {
        Self::new(name, Arc::new(InlineSource::new(fragment)))
    }

    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .insert(Value::String(key.into()), Value::String(value.into()));
        self
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_modification(mut self, modification: Modification) -> Self {
        self.modifications.push(modification);
        self
    }

    pub fn local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }
}

/// One "when present" rule: apply `patch` to the declaring component's own
/// fragment if `trigger` is part of the resolution
#[derive(Debug, Clone, PartialEq)]
pub struct WireRule {
    pub trigger: String,
    pub patch: Value,
}

/// Ordered set of wire rules exported by one component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireRuleSet {
    rules: Vec<WireRule>,
}

impl WireRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when_present(mut self, trigger: impl Into<String>, patch: Value) -> Self {
        self.rules.push(WireRule {
            trigger: trigger.into(),
            patch,
        });
        self
    }

    /// Build from a `{trigger: patch}` mapping, keeping declaration order
    pub fn from_mapping(mapping: &Mapping) -> Result<Self, String> {
        let mut set = Self::new();
        for (trigger, patch) in mapping {
            let trigger = trigger
                .as_str()
                .ok_or_else(|| format!("wire rule trigger must be a string, got {trigger:?}"))?;
            if !patch.is_mapping() {
                return Err(format!("wire rule for '{trigger}' must be a mapping"));
            }
            set = set.when_present(trigger, patch.clone());
        }
        Ok(set)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WireRule> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Names of every component in a finished flatten, in resolved order
#[derive(Debug, Clone, Copy)]
pub struct PresentComponents<'a> {
    names: &'a [String],
}

impl<'a> PresentComponents<'a> {
    pub fn new(names: &'a [String]) -> Self {
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &'a [String] {
        self.names
    }
}

/// Per-component record produced by flattening
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub name: String,
    pub fragment: Value,
    pub is_local: bool,
    pub profiles: Vec<String>,
    pub labels: Mapping,
    pub merged_overrides: Value,
    pub(crate) modifications: Vec<Modification>,
    pub(crate) source: Arc<dyn ComponentSource>,
}

impl ResolvedEntry {
    /// Modifications this component declared against other components
    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }
}
