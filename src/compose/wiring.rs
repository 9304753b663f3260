//! "When present" wiring rules
//!
//! Phase A asks every resolved component for its wire rules, once, after the
//! resolved list is final. Phase B applies each rule whose trigger component
//! is present to the declaring component's own fragment. A component never
//! edits another component's fragment, so the result does not depend on
//! which component was the entry point.

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::component::{PresentComponents, ResolvedEntry};
use super::merge::{MergePolicy, append_unique, deep_copy};
use super::volumes::VolumeMount;
use crate::error::{Error, Result};

/// Condition used when a `depends_on` list is upgraded to the mapping form
const DEFAULT_CONDITION: &str = "service_started";

/// A rule recorded for its trigger
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBinding {
    /// Component that declared the rule and whose fragment it patches
    pub source: String,
    pub patch: Value,
    /// Position of `source` in the resolved list
    source_index: usize,
    /// Position of the rule within the source's rule set
    rule_index: usize,
}

/// All wire rules of one resolution, keyed by trigger name
#[derive(Debug, Clone, Default)]
pub struct WireRegistry {
    by_trigger: BTreeMap<String, Vec<RuleBinding>>,
}

impl WireRegistry {
    /// Rules waiting on `trigger`
    pub fn rules_for(&self, trigger: &str) -> &[RuleBinding] {
        self.by_trigger.get(trigger).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_trigger.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_trigger.is_empty()
    }
}

/// A rule that fired during [`apply_wire_rules`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredRule {
    pub source: String,
    pub trigger: String,
}

/// Phase A: collect the rule sets exported by every resolved component
pub fn collect_wire_rules(entries: &[ResolvedEntry]) -> Result<WireRegistry> {
    let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
    let present = PresentComponents::new(&names);
    let mut registry = WireRegistry::default();

    for (source_index, entry) in entries.iter().enumerate() {
        let exported = entry
            .source
            .export_wire_rules(&present)
            .map_err(|source| Error::Source {
                component: entry.name.clone(),
                source,
            })?;

        let Some(rules) = exported else { continue };
        for (rule_index, rule) in rules.iter().enumerate() {
            registry
                .by_trigger
                .entry(rule.trigger.clone())
                .or_default()
                .push(RuleBinding {
                    source: entry.name.clone(),
                    patch: rule.patch.clone(),
                    source_index,
                    rule_index,
                });
        }
    }

    Ok(registry)
}

/// Phase B: apply every rule whose trigger is present to its source's fragment
pub fn apply_wire_rules(
    entries: &mut [ResolvedEntry],
    registry: &WireRegistry,
    policy: &MergePolicy,
) -> Result<Vec<TriggeredRule>> {
    let mut pending: Vec<(&str, &RuleBinding)> = Vec::new();
    for (trigger, bindings) in &registry.by_trigger {
        if entries.iter().any(|e| &e.name == trigger) {
            pending.extend(bindings.iter().map(|b| (trigger.as_str(), b)));
        } else {
            for binding in bindings {
                debug!(
                    source = %binding.source,
                    trigger = %trigger,
                    "wire rule not triggered"
                );
            }
        }
    }
    pending.sort_by_key(|(_, b)| (b.source_index, b.rule_index));

    let mut triggered = Vec::with_capacity(pending.len());
    for (trigger, binding) in pending {
        let entry = &mut entries[binding.source_index];
        apply_patch(&entry.name, &mut entry.fragment, &binding.patch, policy)?;
        info!(
            source = %binding.source,
            trigger = %trigger,
            "applied wire rule"
        );
        triggered.push(TriggeredRule {
            source: binding.source.clone(),
            trigger: trigger.to_string(),
        });
    }

    Ok(triggered)
}

/// Apply one fragment-shaped patch to `fragment`
pub fn apply_patch(
    component: &str,
    fragment: &mut Value,
    patch: &Value,
    policy: &MergePolicy,
) -> Result<()> {
    let patch = patch
        .as_mapping()
        .ok_or_else(|| Error::invalid_fragment(component, "wire rule patch must be a mapping"))?;
    let root = mapping_mut(component, fragment, "fragment")?;

    for (key, value) in patch {
        if key.as_str() == Some("services") {
            let services = value.as_mapping().ok_or_else(|| {
                Error::invalid_fragment(component, "wire rule 'services' must be a mapping")
            })?;
            for (service, service_patch) in services {
                apply_service_patch(component, root, service, service_patch, policy)?;
            }
        } else {
            match root.get_mut(key) {
                Some(existing) => policy.merge_into(existing, value),
                None => {
                    root.insert(key.clone(), deep_copy(value));
                }
            }
        }
    }

    Ok(())
}

fn apply_service_patch(
    component: &str,
    root: &mut Mapping,
    service: &Value,
    patch: &Value,
    policy: &MergePolicy,
) -> Result<()> {
    let service_name = service
        .as_str()
        .ok_or_else(|| Error::invalid_fragment(component, "service names must be strings"))?
        .to_string();
    let patch = patch.as_mapping().ok_or_else(|| {
        Error::invalid_fragment(
            component,
            format!("wire rule for service '{service_name}' must be a mapping"),
        )
    })?;

    let services = child_mapping(component, root, "services")?;
    let service = child_mapping(component, services, &service_name)?;

    let mut named_volumes = Vec::new();
    for (key, value) in patch {
        match key.as_str() {
            Some("depends_on") => append_depends_on(component, &service_name, service, value)?,
            Some("volumes") => {
                named_volumes.extend(add_volumes(component, &service_name, service, value)?)
            }
            Some("environment") => merge_pairs(component, service, "environment", value, Some(policy))?,
            Some("labels") => merge_pairs(component, service, "labels", value, None)?,
            _ => match service.get_mut(key) {
                Some(existing) => policy.merge_into(existing, value),
                None => {
                    service.insert(key.clone(), deep_copy(value));
                }
            },
        }
    }

    if !named_volumes.is_empty() {
        let declared = child_mapping(component, root, "volumes")?;
        for name in named_volumes {
            let key = Value::String(name);
            if !declared.contains_key(&key) {
                declared.insert(key, Value::Mapping(Mapping::new()));
            }
        }
    }

    Ok(())
}

/// Append dependencies, accepting the list and mapping forms on either side
fn append_depends_on(
    component: &str,
    service_name: &str,
    service: &mut Mapping,
    patch: &Value,
) -> Result<()> {
    let key = Value::String("depends_on".to_string());
    let Some(existing) = service.get_mut(&key) else {
        let mut initial = deep_copy(patch);
        if let Value::Sequence(items) = &mut initial {
            append_unique(items, &[]);
        }
        service.insert(key, initial);
        return Ok(());
    };

    let upgraded = match (&*existing, patch) {
        (Value::Sequence(names), Value::Mapping(_)) => Some(
            names
                .iter()
                .map(|name| (name.clone(), started_condition()))
                .collect::<Mapping>(),
        ),
        _ => None,
    };
    if let Some(upgraded) = upgraded {
        *existing = Value::Mapping(upgraded);
    }

    match (existing, patch) {
        (Value::Sequence(current), Value::Sequence(extra)) => append_unique(current, extra),
        (Value::Mapping(current), Value::Sequence(extra)) => {
            for name in extra {
                if !current.contains_key(name) {
                    current.insert(name.clone(), started_condition());
                }
            }
        }
        (Value::Mapping(current), Value::Mapping(extra)) => {
            for (name, condition) in extra {
                current.insert(name.clone(), deep_copy(condition));
            }
        }
        _ => {
            return Err(Error::invalid_fragment(
                component,
                format!("service '{service_name}' has depends_on that is neither a list nor a mapping"),
            ));
        }
    }

    Ok(())
}

fn started_condition() -> Value {
    let mut condition = Mapping::new();
    condition.insert(
        Value::String("condition".to_string()),
        Value::String(DEFAULT_CONDITION.to_string()),
    );
    Value::Mapping(condition)
}

/// Append volume entries, rejecting a second entry for an existing mount point.
///
/// Returns the named volumes that must be declared at the top level.
fn add_volumes(
    component: &str,
    service_name: &str,
    service: &mut Mapping,
    patch: &Value,
) -> Result<Vec<String>> {
    let extra = patch.as_sequence().ok_or_else(|| {
        Error::invalid_fragment(
            component,
            format!("volumes for service '{service_name}' must be a list"),
        )
    })?;

    let key = Value::String("volumes".to_string());
    if !service.contains_key(&key) {
        service.insert(key.clone(), Value::Sequence(Vec::new()));
    }
    let current = service
        .get_mut(&key)
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| {
            Error::invalid_fragment(
                component,
                format!("service '{service_name}' has volumes that are not a list"),
            )
        })?;

    let parse = |entry: &Value| {
        VolumeMount::parse(entry).map_err(|reason| Error::InvalidVolume {
            component: component.to_string(),
            service: service_name.to_string(),
            spec: describe(entry),
            reason,
        })
    };

    let mut targets = Vec::with_capacity(current.len() + extra.len());
    for entry in current.iter() {
        targets.push(parse(entry)?.target);
    }

    let mut named = Vec::new();
    for entry in extra {
        let mount = parse(entry)?;
        if current.contains(entry) {
            continue;
        }
        if targets.contains(&mount.target) {
            return Err(Error::DuplicateMount {
                component: component.to_string(),
                service: service_name.to_string(),
                target: mount.target,
            });
        }
        if let Some(name) = mount.named_volume() {
            named.push(name.to_string());
        }
        targets.push(mount.target);
        current.push(deep_copy(entry));
    }

    Ok(named)
}

fn describe(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Merge `KEY=value` style settings (`environment`, `labels`).
///
/// Both the list form and the mapping form are accepted; the existing form of
/// the service is kept. With a policy, string values follow the merge string
/// rules; without one the patch value replaces.
fn merge_pairs(
    component: &str,
    service: &mut Mapping,
    field: &str,
    patch: &Value,
    policy: Option<&MergePolicy>,
) -> Result<()> {
    let incoming = to_pairs(component, field, patch)?;
    let key = Value::String(field.to_string());

    let Some(existing) = service.get_mut(&key) else {
        service.insert(key, deep_copy(patch));
        return Ok(());
    };

    let as_list = existing.is_sequence();
    let mut current = to_pairs(component, field, existing)?;

    for (name, value) in incoming.iter() {
        let merged = match (current.get(name), value, policy) {
            (Some(Value::String(old)), Value::String(new), Some(policy)) => {
                Value::String(policy.merge_strings(name.as_str(), old, new))
            }
            _ => deep_copy(value),
        };
        current.insert(name.clone(), merged);
    }

    *existing = if as_list {
        Value::Sequence(
            current
                .iter()
                .map(|(name, value)| Value::String(format_pair(name, value)))
                .collect(),
        )
    } else {
        Value::Mapping(current)
    };

    Ok(())
}

/// Normalize a list or mapping of settings into an ordered mapping
fn to_pairs(component: &str, field: &str, value: &Value) -> Result<Mapping> {
    match value {
        Value::Mapping(mapping) => Ok(mapping.clone()),
        Value::Sequence(items) => {
            let mut pairs = Mapping::new();
            for item in items {
                let raw = item.as_str().ok_or_else(|| {
                    Error::invalid_fragment(component, format!("{field} entries must be strings"))
                })?;
                match raw.split_once('=') {
                    Some((name, value)) => pairs.insert(
                        Value::String(name.to_string()),
                        Value::String(value.to_string()),
                    ),
                    None => pairs.insert(Value::String(raw.to_string()), Value::Null),
                };
            }
            Ok(pairs)
        }
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::invalid_fragment(
            component,
            format!("{field} must be a list or a mapping"),
        )),
    }
}

fn format_pair(name: &Value, value: &Value) -> String {
    let name = scalar_text(name);
    match value {
        Value::Null => name,
        other => format!("{name}={}", scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => describe(other),
    }
}

fn mapping_mut<'a>(component: &str, value: &'a mut Value, what: &str) -> Result<&'a mut Mapping> {
    if value.is_null() {
        *value = Value::Mapping(Mapping::new());
    }
    value
        .as_mapping_mut()
        .ok_or_else(|| Error::invalid_fragment(component, format!("{what} must be a mapping")))
}

/// Mapping stored under `key`, created empty when absent
fn child_mapping<'a>(component: &str, parent: &'a mut Mapping, key: &str) -> Result<&'a mut Mapping> {
    let key_value = Value::String(key.to_string());
    if !parent.contains_key(&key_value) {
        debug!(component = %component, key = %key, "creating missing section");
        parent.insert(key_value.clone(), Value::Mapping(Mapping::new()));
    }
    let child = parent
        .get_mut(&key_value)
        .ok_or_else(|| Error::invalid_fragment(component, format!("'{key}' vanished")))?;
    mapping_mut(component, child, &format!("'{key}'"))
}
