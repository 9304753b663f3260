//! Cross-component override patches
//!
//! Modifications are collected in resolved order (externally supplied ones
//! last) and merged into the target entry's overrides, so later patches win
//! scalar conflicts.

use serde_yaml::Value;
use tracing::{info, warn};

use super::component::{Modification, ResolvedEntry};
use super::merge::MergePolicy;
use crate::error::{Error, Result};

/// Origin recorded for modifications supplied outside the component tree
pub const EXTERNAL_ORIGIN: &str = "<external>";

/// A modification tagged with the component that declared it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingModification {
    pub origin: String,
    pub target: Option<String>,
    pub patch: Value,
}

/// What happened to one modification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationOutcome {
    pub origin: String,
    pub target: String,
}

/// Result of applying all modifications of a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationReport {
    pub applied: Vec<ModificationOutcome>,
    /// Modifications whose target is not part of the resolution
    pub dropped: Vec<ModificationOutcome>,
}

/// Gather every modification declared by resolved components, then `external`
pub fn collect_modifications(
    entries: &[ResolvedEntry],
    external: &[Modification],
) -> Vec<PendingModification> {
    let declared = entries.iter().flat_map(|entry| {
        entry
            .modifications()
            .iter()
            .map(move |m| pending(&entry.name, m))
    });
    let supplied = external.iter().map(|m| pending(EXTERNAL_ORIGIN, m));
    declared.chain(supplied).collect()
}

fn pending(origin: &str, modification: &Modification) -> PendingModification {
    PendingModification {
        origin: origin.to_string(),
        target: modification.target.clone(),
        patch: modification.patch.clone(),
    }
}

/// Merge each modification into its target's overrides, in order.
///
/// Every modification is validated before any entry is touched. A missing
/// target name is fatal; a target absent from `entries` is dropped with a
/// warning.
pub fn apply_modifications(
    entries: &mut [ResolvedEntry],
    modifications: &[PendingModification],
    policy: &MergePolicy,
) -> Result<ModificationReport> {
    let mut targeted = Vec::with_capacity(modifications.len());
    for modification in modifications {
        match modification.target.as_deref().map(str::trim) {
            Some(target) if !target.is_empty() => targeted.push((target, modification)),
            _ => {
                return Err(Error::ModificationWithoutTarget {
                    origin: modification.origin.clone(),
                });
            }
        }
    }

    let mut report = ModificationReport::default();
    for (target, modification) in targeted {
        let outcome = ModificationOutcome {
            origin: modification.origin.clone(),
            target: target.to_string(),
        };

        match entries.iter_mut().find(|e| e.name == target) {
            Some(entry) => {
                policy.merge_into(&mut entry.merged_overrides, &modification.patch);
                info!(
                    source = %modification.origin,
                    target = %target,
                    "applied modification"
                );
                report.applied.push(outcome);
            }
            None => {
                warn!(
                    source = %modification.origin,
                    target = %target,
                    "modification targets a component that is not part of this resolution, dropping it"
                );
                report.dropped.push(outcome);
            }
        }
    }

    Ok(report)
}
