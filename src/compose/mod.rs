//! Component resolution engine
//!
//! A resolution runs, in order:
//!
//! ```text
//! flatten → apply modifications → materialize overrides → wire rules
//! ```
//!
//! - `graph` flattens the component tree into startup order, de-duplicating
//!   by name and filtering by active profiles
//! - `modifications` merges cross-component patches into target overrides
//! - overrides are merged into each fragment, and component labels stamped
//!   onto its services
//! - `wiring` applies "when present" rules to each declaring component
//!
//! All structural validation happens before wiring starts, and a failed
//! resolution returns no entries at all. Every input comes in through
//! [`ResolutionContext`]; nothing is shared between resolutions.

use serde_yaml::{Mapping, Value};

pub mod component;
pub mod graph;
pub mod merge;
pub mod modifications;
pub mod output;
pub mod profiles;
pub mod volumes;
pub mod wiring;

pub use self::component::{
    Component, ComponentSource, InlineSource, Modification, PresentComponents, ResolvedEntry,
    WireRule, WireRuleSet,
};
pub use self::graph::flatten;
pub use self::merge::{MergePolicy, deep_copy};
pub use self::modifications::{ModificationOutcome, ModificationReport};
pub use self::output::{
    FRAGMENTS_DIR, INCLUDE_FILE, fragment_file_name, include_document, staged_paths,
};
pub use self::profiles::{PROFILES_ENV, active_profiles, is_included};
pub use self::wiring::TriggeredRule;

use crate::error::{Error, Result};

/// Inputs of one resolution besides the component tree
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    pub active_profiles: Vec<String>,
    /// Modifications supplied from outside the tree, applied last
    pub modifications: Vec<Modification>,
    pub merge_policy: MergePolicy,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(mut self, profiles: Vec<String>) -> Self {
        self.active_profiles = profiles;
        self
    }

    pub fn with_modifications(mut self, modifications: Vec<Modification>) -> Self {
        self.modifications = modifications;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }
}

/// Non-local effects recorded during a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub modifications: ModificationReport,
    pub triggered_rules: Vec<TriggeredRule>,
}

/// Output of a successful resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Final entries in startup order
    pub entries: Vec<ResolvedEntry>,
    pub report: ResolutionReport,
}

impl Resolution {
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Top-level document including every staged fragment
    pub fn include_document(&self) -> Result<Value> {
        include_document(&self.entries)
    }

    /// Staged fragment path of every entry, in resolved order
    pub fn staged_paths(&self) -> Result<Vec<String>> {
        staged_paths(&self.entries)
    }
}

/// Resolve `root` plus `extra_roots` into final per-component fragments
pub fn resolve(
    root: &Component,
    extra_roots: &[Component],
    ctx: &ResolutionContext,
) -> Result<Resolution> {
    let mut entries = graph::flatten(root, extra_roots, ctx)?;

    let pending = modifications::collect_modifications(&entries, &ctx.modifications);
    let modification_report =
        modifications::apply_modifications(&mut entries, &pending, &ctx.merge_policy)?;

    for entry in &mut entries {
        materialize(entry, &ctx.merge_policy)?;
    }

    let registry = wiring::collect_wire_rules(&entries)?;
    let triggered_rules = wiring::apply_wire_rules(&mut entries, &registry, &ctx.merge_policy)?;

    Ok(Resolution {
        entries,
        report: ResolutionReport {
            modifications: modification_report,
            triggered_rules,
        },
    })
}

/// Fold merged overrides into the fragment and stamp component labels
fn materialize(entry: &mut ResolvedEntry, policy: &MergePolicy) -> Result<()> {
    policy.merge_into(&mut entry.fragment, &entry.merged_overrides);

    if entry.labels.is_empty() {
        return Ok(());
    }

    let services = match entry.fragment.get("services") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Mapping(services)) => services.keys().cloned().collect::<Vec<_>>(),
        Some(_) => {
            return Err(Error::invalid_fragment(
                &entry.name,
                "'services' must be a mapping",
            ));
        }
    };

    let mut stamp = Mapping::new();
    stamp.insert(
        Value::String("labels".to_string()),
        Value::Mapping(entry.labels.clone()),
    );
    let stamp = Value::Mapping(stamp);

    let mut patch = Mapping::new();
    patch.insert(
        Value::String("services".to_string()),
        Value::Mapping(
            services
                .into_iter()
                .map(|service| (service, stamp.clone()))
                .collect(),
        ),
    );

    wiring::apply_patch(&entry.name, &mut entry.fragment, &Value::Mapping(patch), policy)
}
