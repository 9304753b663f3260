//! `component.yaml` manifest format

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Manifest file looked up in a component directory
pub const MANIFEST_FILE: &str = "component.yaml";

/// Fragment file used when the manifest names none
pub const DEFAULT_FRAGMENT_FILE: &str = "compose.yaml";

/// Parsed `component.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Defaults to the directory name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub fragment: Option<FragmentRef>,

    /// Component specs, resolved relative to the manifest's directory
    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub profiles: Vec<String>,

    #[serde(default)]
    pub labels: Mapping,

    #[serde(default)]
    pub overrides: Option<Value>,

    #[serde(default)]
    pub modifications: Vec<ManifestModification>,

    /// Wire rules: trigger component name → fragment-shaped patch
    #[serde(default)]
    pub when_present: Mapping,
}

/// Where the base fragment lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FragmentRef {
    /// File relative to the manifest's directory
    Path(String),
    Inline(Mapping),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestModification {
    #[serde(default)]
    pub target: Option<String>,
    pub patch: Value,
}

impl Manifest {
    /// Read and parse the manifest at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest: Manifest = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        manifest
            .validate()
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            anyhow::bail!("'name' cannot be empty");
        }
        if let Some(overrides) = &self.overrides
            && !overrides.is_mapping()
        {
            anyhow::bail!("'overrides' must be a mapping");
        }
        for child in &self.children {
            if child.trim().is_empty() {
                anyhow::bail!("'children' cannot contain empty specs");
            }
        }
        Ok(())
    }
}
