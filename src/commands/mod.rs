//! CLI command implementations
//!
//! Commands load components from disk, hand them to the resolution engine,
//! and present or write the result.

pub mod assemble;
pub mod graph;
pub mod output;
pub mod validation;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compose::{self, Component, Modification, Resolution, ResolutionContext};
use crate::config::StitchConfig;
use crate::loader::ComponentLoader;

/// Inputs shared by every command that resolves a stack
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Root component spec
    pub root: String,
    /// Extra root specs, attached after the root's own children
    pub extras: Vec<String>,
    /// Active profiles, already merged with the environment
    pub profiles: Vec<String>,
    /// `TARGET=PATCH.yaml` modifications
    pub modifications: Vec<String>,
    /// Directories searched before the configured search paths
    pub search_paths: Vec<PathBuf>,
}

/// Load the root and extras, then run a resolution
pub fn resolve_stack(config: StitchConfig, options: &ResolveOptions) -> Result<Resolution> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let policy = config.merge_policy();
    let loader = Arc::new(
        ComponentLoader::new(config)?.with_search_paths(options.search_paths.iter().cloned()),
    );

    let root = loader.load(&options.root, &cwd)?;
    let extras = options
        .extras
        .iter()
        .map(|spec| loader.load(spec, &cwd))
        .collect::<Result<Vec<Component>>>()?;

    let modifications = options
        .modifications
        .iter()
        .map(|arg| parse_modification(arg, &cwd))
        .collect::<Result<Vec<_>>>()?;

    let ctx = ResolutionContext::new()
        .with_profiles(options.profiles.clone())
        .with_modifications(modifications)
        .with_merge_policy(policy);

    let resolution = compose::resolve(&root, &extras, &ctx)?;
    Ok(resolution)
}

/// Parse a `TARGET=PATCH.yaml` argument
///
/// An empty target is kept as `None`; the resolution rejects it with the
/// other untargeted modifications.
pub fn parse_modification(arg: &str, base_dir: &Path) -> Result<Modification> {
    let (target, file) = arg
        .split_once('=')
        .with_context(|| format!("modification '{}' must have the form TARGET=PATCH.yaml", arg))?;

    let path = base_dir.join(file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read modification patch: {}", path.display()))?;
    let patch: serde_yaml::Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse modification patch: {}", path.display()))?;
    if !patch.is_mapping() {
        anyhow::bail!("modification patch {} must be a mapping", path.display());
    }

    let target = target.trim();
    Ok(Modification {
        target: (!target.is_empty()).then(|| target.to_string()),
        patch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_modification() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("patch.yaml"), "services: {db: {}}").unwrap();

        let modification = parse_modification("db=patch.yaml", temp.path()).unwrap();
        assert_eq!(modification.target.as_deref(), Some("db"));
        assert!(modification.patch.is_mapping());
    }

    #[test]
    fn test_parse_modification_empty_target() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("patch.yaml"), "a: 1").unwrap();

        let modification = parse_modification("=patch.yaml", temp.path()).unwrap();
        assert_eq!(modification.target, None);
    }

    #[test]
    fn test_parse_modification_malformed() {
        let temp = TempDir::new().unwrap();
        assert!(parse_modification("db", temp.path()).is_err());
        assert!(parse_modification("db=missing.yaml", temp.path()).is_err());

        std::fs::write(temp.path().join("list.yaml"), "[1, 2]").unwrap();
        assert!(parse_modification("db=list.yaml", temp.path()).is_err());
    }
}
