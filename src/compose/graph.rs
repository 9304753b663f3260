//! Dependency graph flattening
//!
//! Depth-first traversal that appends a component only after all of its
//! children, so the output is a valid startup order. Names are unique within
//! a resolution: a repeat visit merges its overrides into the first entry
//! instead of appending again.

use std::collections::HashMap;
use tracing::debug;

use super::component::{Component, ResolvedEntry};
use super::merge::deep_copy;
use super::profiles::{is_included, union_profiles};
use super::ResolutionContext;
use crate::error::{Error, Result};

/// Traversal state of a component name
#[derive(Debug, Clone, Copy)]
enum Visit {
    /// Subtree traversal has started but the component is not appended yet
    InProgress,
    /// Appended at this index of the output
    Included(usize),
    /// Traversed, but filtered out by profiles
    Excluded,
}

/// Flatten `root` and `extra_roots` into an ordered, de-duplicated list.
///
/// Children of `root` are visited first, then every extra root, then `root`
/// itself. Components excluded by the active profiles are left out but their
/// subtrees are still traversed.
pub fn flatten(
    root: &Component,
    extra_roots: &[Component],
    ctx: &ResolutionContext,
) -> Result<Vec<ResolvedEntry>> {
    let mut flattener = Flattener {
        ctx,
        entries: Vec::new(),
        visits: HashMap::new(),
        stack: Vec::new(),
    };
    flattener.visit(root, extra_roots)?;
    Ok(flattener.entries)
}

struct Flattener<'a> {
    ctx: &'a ResolutionContext,
    entries: Vec<ResolvedEntry>,
    visits: HashMap<String, Visit>,
    stack: Vec<String>,
}

impl Flattener<'_> {
    fn visit(&mut self, component: &Component, extra_children: &[Component]) -> Result<()> {
        match self.visits.get(&component.name).copied() {
            Some(Visit::InProgress) => Err(self.cycle_error(&component.name)),
            Some(Visit::Included(index)) => {
                self.merge_repeat(index, component);
                Ok(())
            }
            Some(Visit::Excluded) => {
                debug!(
                    component = %component.name,
                    "ignoring repeat of a component excluded by profiles"
                );
                Ok(())
            }
            None => self.enter(component, extra_children),
        }
    }

    fn enter(&mut self, component: &Component, extra_children: &[Component]) -> Result<()> {
        let name = component.name.clone();
        self.visits.insert(name.clone(), Visit::InProgress);
        self.stack.push(name.clone());

        let exported = component
            .source
            .export_children()
            .map_err(|source| Error::Source {
                component: name.clone(),
                source,
            })?;

        for child in component
            .children
            .iter()
            .chain(exported.iter())
            .chain(extra_children.iter())
        {
            self.visit(child, &[])?;
        }

        self.stack.pop();

        if !is_included(&component.profiles, &self.ctx.active_profiles) {
            debug!(
                component = %name,
                profiles = ?component.profiles,
                "excluded by active profiles"
            );
            self.visits.insert(name, Visit::Excluded);
            return Ok(());
        }

        let fragment = component
            .source
            .load_fragment()
            .map_err(|source| Error::Source {
                component: name.clone(),
                source,
            })?
            .ok_or_else(|| Error::MissingFragment {
                component: name.clone(),
            })?;

        self.visits
            .insert(name.clone(), Visit::Included(self.entries.len()));
        self.entries.push(ResolvedEntry {
            name,
            fragment,
            is_local: component.is_local,
            profiles: component.profiles.clone(),
            labels: component.labels.clone(),
            merged_overrides: deep_copy(&component.overrides),
            modifications: component.modifications.clone(),
            source: component.source.clone(),
        });
        Ok(())
    }

    /// Fold a repeat occurrence into the entry recorded at `index`
    fn merge_repeat(&mut self, index: usize, component: &Component) {
        let policy = &self.ctx.merge_policy;
        let entry = &mut self.entries[index];

        debug!(component = %entry.name, "merging repeated component into first occurrence");

        policy.merge_into(&mut entry.merged_overrides, &component.overrides);
        union_profiles(&mut entry.profiles, &component.profiles);
        policy.merge_mapping(&mut entry.labels, &component.labels);
        for modification in &component.modifications {
            if !entry.modifications.contains(modification) {
                entry.modifications.push(modification.clone());
            }
        }
    }

    fn cycle_error(&self, name: &str) -> Error {
        let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
        let mut path: Vec<String> = self.stack[start..].to_vec();
        path.push(name.to_string());
        Error::Cycle {
            component: name.to_string(),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::component::{ComponentSource, InlineSource};
    use crate::error::SourceError;
    use serde_yaml::Value;
    use std::sync::Arc;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    fn leaf(name: &str) -> Component {
        Component::inline(name, yaml(&format!("services: {{{name}: {{image: {name}}}}}")))
    }

    fn names(entries: &[ResolvedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn ctx() -> ResolutionContext {
        ResolutionContext::default()
    }

    #[test]
    fn test_children_before_parent() {
        let root = leaf("app").with_child(leaf("db")).with_child(leaf("cache"));
        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(names(&entries), vec!["db", "cache", "app"]);
    }

    #[test]
    fn test_extra_roots_before_root() {
        let root = leaf("app").with_child(leaf("db"));
        let entries = flatten(&root, &[leaf("metrics")], &ctx()).unwrap();
        assert_eq!(names(&entries), vec!["db", "metrics", "app"]);
    }

    #[test]
    fn test_transitive_order() {
        let root = leaf("app").with_child(leaf("api").with_child(leaf("db").with_child(leaf("volume-init"))));
        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(names(&entries), vec!["volume-init", "db", "api", "app"]);
    }

    #[test]
    fn test_duplicate_is_appended_once_and_overrides_merge() {
        let root = leaf("app")
            .with_child(leaf("db").with_overrides(yaml("a: 1")))
            .with_child(leaf("api").with_child(leaf("db").with_overrides(yaml("a: 2"))));

        let entries = flatten(&root, &[], &ctx()).unwrap();

        assert_eq!(names(&entries), vec!["db", "api", "app"]);
        assert_eq!(entries[0].merged_overrides, yaml("a: 2"));
    }

    #[test]
    fn test_duplicate_non_concat_env_replaces() {
        let root = leaf("app")
            .with_child(leaf("db").with_overrides(yaml("env: {V: x}")))
            .with_child(leaf("db").with_overrides(yaml("env: {V: y}")));

        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(entries[0].merged_overrides, yaml("env: {V: y}"));
    }

    #[test]
    fn test_duplicate_unions_profiles_and_labels() {
        let root = leaf("app")
            .with_child(leaf("db").with_label("tier", "data"))
            .with_child(leaf("db").with_label("owner", "ops"));

        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(entries[0].labels.len(), 2);
    }

    #[test]
    fn test_profile_excluded_component_absent() {
        for active in [vec![], vec!["dev".to_string()]] {
            let context = ResolutionContext::default().with_profiles(active);
            let root = leaf("app").with_child(leaf("grafana").with_profiles(["full"]));
            let entries = flatten(&root, &[], &context).unwrap();
            assert_eq!(names(&entries), vec!["app"]);
        }
    }

    #[test]
    fn test_profile_included_component_present() {
        for active in [vec!["full"], vec!["full", "dev"]] {
            let context = ResolutionContext::default()
                .with_profiles(active.into_iter().map(String::from).collect());
            let root = leaf("app").with_child(leaf("grafana").with_profiles(["full"]));
            let entries = flatten(&root, &[], &context).unwrap();
            assert_eq!(names(&entries), vec!["grafana", "app"]);
        }
    }

    #[test]
    fn test_excluded_component_subtree_still_traversed() {
        let root = leaf("app").with_child(
            leaf("grafana")
                .with_profiles(["full"])
                .with_child(leaf("prometheus")),
        );
        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(names(&entries), vec!["prometheus", "app"]);
    }

    #[test]
    fn test_first_occurrence_decides_profile_gating() {
        // Unconditional first, gated later: stays included, profiles unioned
        let root = leaf("app")
            .with_child(leaf("db"))
            .with_child(leaf("db").with_profiles(["full"]));
        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(names(&entries), vec!["db", "app"]);
        assert_eq!(entries[0].profiles, vec!["full"]);

        // Gated first, unconditional later: stays excluded
        let root = leaf("app")
            .with_child(leaf("db").with_profiles(["full"]))
            .with_child(leaf("db"));
        let entries = flatten(&root, &[], &ctx()).unwrap();
        assert_eq!(names(&entries), vec!["app"]);
    }

    #[test]
    fn test_cycle_is_fatal() {
        #[derive(Debug)]
        struct Looping;
        impl ComponentSource for Looping {
            fn load_fragment(&self) -> Result<Option<Value>, SourceError> {
                Ok(Some(Value::Null))
            }
            fn export_children(&self) -> Result<Vec<Component>, SourceError> {
                Ok(vec![Component::new("a", Arc::new(Looping))])
            }
        }

        let root = Component::new("a", Arc::new(Looping));
        let err = flatten(&root, &[], &ctx()).unwrap_err();
        match err {
            Error::Cycle { component, path } => {
                assert_eq!(component, "a");
                assert_eq!(path, vec!["a", "a"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_indirect_cycle_reports_path() {
        // b depends on c, c depends on b
        #[derive(Debug)]
        struct Pair(&'static str);
        impl ComponentSource for Pair {
            fn load_fragment(&self) -> Result<Option<Value>, SourceError> {
                Ok(Some(Value::Null))
            }
            fn export_children(&self) -> Result<Vec<Component>, SourceError> {
                let other = if self.0 == "b" { "c" } else { "b" };
                Ok(vec![Component::new(other, Arc::new(Pair(other)))])
            }
        }

        let root = leaf("app").with_child(Component::new("b", Arc::new(Pair("b"))));
        let err = flatten(&root, &[], &ctx()).unwrap_err();
        assert!(err.to_string().contains("b → c → b"), "{err}");
    }

    #[test]
    fn test_extra_root_depending_on_root_is_cycle() {
        let root = leaf("app").with_child(leaf("db"));
        let metrics = leaf("metrics").with_child(leaf("app"));

        let err = flatten(&root, &[metrics], &ctx()).unwrap_err();
        match err {
            Error::Cycle { component, path } => {
                assert_eq!(component, "app");
                assert_eq!(path, vec!["app", "metrics", "app"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_fragment_is_fatal() {
        let root = leaf("app").with_child(Component::new("ghost", Arc::new(InlineSource::empty())));
        let err = flatten(&root, &[], &ctx()).unwrap_err();
        assert!(matches!(err, Error::MissingFragment { ref component } if component == "ghost"));
    }

    #[test]
    fn test_excluded_component_fragment_never_loaded() {
        let ghost = Component::new("ghost", Arc::new(InlineSource::empty())).with_profiles(["full"]);
        let root = leaf("app").with_child(ghost);
        assert!(flatten(&root, &[], &ctx()).is_ok());
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let root = leaf("app")
            .with_child(leaf("db").with_overrides(yaml("a: 1")))
            .with_child(leaf("db").with_overrides(yaml("b: 2")));
        let extras = [leaf("metrics")];

        let first = flatten(&root, &extras, &ctx()).unwrap();
        let second = flatten(&root, &extras, &ctx()).unwrap();

        assert_eq!(names(&first), names(&second));
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.merged_overrides, b.merged_overrides);
        }
    }
}
