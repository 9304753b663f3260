//! Filesystem component loading
//!
//! Turns component specs into [`Component`]s backed by files on disk.
//! A spec is resolved in order:
//!
//! ```text
//! path spec? ──Yes──> <base_dir>/<spec>
//!     │ No
//! alias in config? ──Yes──> resolve the alias target
//!     │ No
//! registry spec? ──Yes──> error (remote sources are unsupported)
//!     │ No
//! first <search_path>/<spec> that exists
//! ```
//!
//! Children declared in a manifest are only loaded when the resolver asks
//! for them, so a directory cycle ends up as a dependency cycle error
//! instead of unbounded recursion here.

pub mod manifest;

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::compose::{Component, ComponentSource, Modification, PresentComponents, WireRuleSet};
use crate::config::{StitchConfig, utils};
use crate::error::SourceError;

pub use manifest::{DEFAULT_FRAGMENT_FILE, FragmentRef, MANIFEST_FILE, Manifest};

/// Resolves component specs against the filesystem and the user config
#[derive(Debug, Clone, Default)]
pub struct ComponentLoader {
    config: StitchConfig,
    search_paths: Vec<PathBuf>,
}

impl ComponentLoader {
    /// Loader searching the config's search paths
    pub fn new(config: StitchConfig) -> Result<Self> {
        let search_paths = config
            .search_paths
            .iter()
            .map(|p| utils::expand_home(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config,
            search_paths,
        })
    }

    /// Search `dirs` before the configured search paths
    pub fn with_search_paths(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut search_paths: Vec<PathBuf> = dirs.into_iter().collect();
        search_paths.append(&mut self.search_paths);
        self.search_paths = search_paths;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load the component named by `spec`; relative paths resolve against `base_dir`
    pub fn load(self: &Arc<Self>, spec: &str, base_dir: &Path) -> Result<Component> {
        let (path, is_local) = self.locate(spec, base_dir)?;
        debug!(spec = %spec, path = %path.display(), "located component");
        self.load_path(&path, is_local)
            .with_context(|| format!("Failed to load component '{}'", spec))
    }

    /// Find the file or directory backing `spec`
    pub fn locate(&self, spec: &str, base_dir: &Path) -> Result<(PathBuf, bool)> {
        if utils::is_path_spec(spec) {
            let path = utils::expand_home(spec)?;
            let path = if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            };
            if !path.exists() {
                anyhow::bail!("component path '{}' does not exist", path.display());
            }
            return Ok((path, true));
        }

        if let Some(target) = self.config.resolve_alias(spec) {
            debug!(alias = %spec, target = %target, "resolved alias");
            let (path, _) = self.locate(target, base_dir)?;
            return Ok((path, false));
        }

        if utils::is_registry_spec(spec) {
            anyhow::bail!(
                "component '{}' looks like a registry package; only local components are supported",
                spec
            );
        }

        for dir in &self.search_paths {
            for candidate in [
                dir.join(spec),
                dir.join(format!("{spec}.yaml")),
                dir.join(format!("{spec}.yml")),
            ] {
                if candidate.exists() {
                    return Ok((candidate, false));
                }
            }
        }

        anyhow::bail!(
            "component '{}' not found: not a path, not an alias, and not in any search path{}",
            spec,
            self.describe_search_paths()
        )
    }

    fn describe_search_paths(&self) -> String {
        if self.search_paths.is_empty() {
            return String::new();
        }
        let dirs: Vec<String> = self
            .search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!(" ({})", dirs.join(", "))
    }

    fn load_path(self: &Arc<Self>, path: &Path, is_local: bool) -> Result<Component> {
        if path.is_file() {
            return Ok(self.bare_component(file_stem(path)?, path.to_path_buf(), is_local));
        }

        let manifest_path = path.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let manifest = Manifest::load(&manifest_path)?;
            return self.manifest_component(path, manifest, is_local);
        }

        let fragment = path.join(DEFAULT_FRAGMENT_FILE);
        if fragment.is_file() {
            return Ok(self.bare_component(dir_name(path)?, fragment, is_local));
        }

        anyhow::bail!(
            "'{}' contains neither {} nor {}",
            path.display(),
            MANIFEST_FILE,
            DEFAULT_FRAGMENT_FILE
        )
    }

    /// Component made of a fragment file alone
    fn bare_component(self: &Arc<Self>, name: String, fragment: PathBuf, is_local: bool) -> Component {
        let base_dir = fragment
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let source = FileSource {
            loader: Arc::clone(self),
            base_dir,
            fragment: FragmentLocation::File(fragment),
            children: Vec::new(),
            when_present: Mapping::new(),
        };
        Component::new(name, Arc::new(source)).local(is_local)
    }

    fn manifest_component(
        self: &Arc<Self>,
        dir: &Path,
        manifest: Manifest,
        is_local: bool,
    ) -> Result<Component> {
        let name = match manifest.name {
            Some(name) => name,
            None => dir_name(dir)?,
        };
        let fragment = match manifest.fragment {
            Some(FragmentRef::Inline(mapping)) => FragmentLocation::Inline(Value::Mapping(mapping)),
            Some(FragmentRef::Path(file)) => FragmentLocation::File(dir.join(file)),
            None => FragmentLocation::File(dir.join(DEFAULT_FRAGMENT_FILE)),
        };

        let source = FileSource {
            loader: Arc::clone(self),
            base_dir: dir.to_path_buf(),
            fragment,
            children: manifest.children,
            when_present: manifest.when_present,
        };

        let mut component = Component::new(name, Arc::new(source))
            .with_profiles(manifest.profiles)
            .local(is_local);
        component.labels = manifest.labels;
        if let Some(overrides) = manifest.overrides {
            component.overrides = overrides;
        }
        component.modifications = manifest
            .modifications
            .into_iter()
            .map(|m| Modification {
                target: m.target,
                patch: m.patch,
            })
            .collect();

        Ok(component)
    }
}

#[derive(Debug, Clone)]
enum FragmentLocation {
    File(PathBuf),
    Inline(Value),
}

/// Component source backed by a directory or fragment file
#[derive(Debug)]
pub struct FileSource {
    loader: Arc<ComponentLoader>,
    base_dir: PathBuf,
    fragment: FragmentLocation,
    children: Vec<String>,
    when_present: Mapping,
}

impl ComponentSource for FileSource {
    fn load_fragment(&self) -> Result<Option<Value>, SourceError> {
        let path = match &self.fragment {
            FragmentLocation::Inline(value) => return Ok(Some(value.clone())),
            FragmentLocation::File(path) => path,
        };
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fragment: {}", path.display()))?;
        let fragment: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse fragment: {}", path.display()))?;

        match fragment {
            Value::Null => Ok(Some(Value::Mapping(Mapping::new()))),
            Value::Mapping(_) => Ok(Some(fragment)),
            _ => Err(format!("fragment {} is not a mapping", path.display()).into()),
        }
    }

    fn export_children(&self) -> Result<Vec<Component>, SourceError> {
        let children = self
            .children
            .iter()
            .map(|spec| self.loader.load(spec, &self.base_dir))
            .collect::<Result<Vec<_>>>()?;
        Ok(children)
    }

    fn export_wire_rules(
        &self,
        _present: &PresentComponents<'_>,
    ) -> Result<Option<WireRuleSet>, SourceError> {
        if self.when_present.is_empty() {
            return Ok(None);
        }
        let rules = WireRuleSet::from_mapping(&self.when_present)?;
        Ok(Some(rules))
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .with_context(|| format!("cannot derive a component name from {}", path.display()))
}

fn dir_name(path: &Path) -> Result<String> {
    let path = path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", path.display()))?;
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .with_context(|| format!("cannot derive a component name from {}", path.display()))
}
