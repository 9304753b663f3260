//! Configuration schema for stitch
//!
//! Every field has a serde default so partial configs load, and empty
//! sections are skipped on save.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::compose::MergePolicy;
use crate::compose::merge::DEFAULT_CONCAT_KEYS;

/// Main configuration structure for stitch
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StitchConfig {
    /// Directories searched for components referenced by bare name
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<String>,

    /// Component aliases: short name → path or another alias
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "MergeSettings::is_default")]
    pub merge: MergeSettings,
}

/// `[merge]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeSettings {
    /// Keys whose string values are comma-joined instead of replaced
    #[serde(default = "default_concat_keys")]
    pub concat_keys: Vec<String>,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            concat_keys: default_concat_keys(),
        }
    }
}

impl MergeSettings {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

fn default_concat_keys() -> Vec<String> {
    DEFAULT_CONCAT_KEYS.iter().map(|k| k.to_string()).collect()
}

impl StitchConfig {
    /// Merge policy configured by the `[merge]` section
    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy::new(self.merge.concat_keys.iter().cloned())
    }

    /// Validate the configuration for common errors
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for alias in self.components.keys() {
            if let Err(e) = self.validate_alias_chain(alias) {
                errors.push(e);
            }
        }

        for key in &self.merge.concat_keys {
            if key.trim().is_empty() {
                errors.push("merge.concat_keys must not contain empty keys".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate that an alias chain doesn't contain cycles
    fn validate_alias_chain(&self, alias: &str) -> Result<(), String> {
        use super::utils;

        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = alias;

        while let Some(target) = self.components.get(current) {
            chain.push(current.to_string());
            if !visited.insert(current) {
                return Err(format!(
                    "Circular alias dependency detected: {}",
                    chain.join(" → ")
                ));
            }
            if utils::is_path_spec(target) || utils::is_registry_spec(target) {
                break;
            }
            current = target;
        }
        Ok(())
    }

    /// Follow aliases from `name` to the spec they finally point at
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        let mut current = name;
        let mut hops = 0;
        while let Some(target) = self.components.get(current) {
            hops += 1;
            if hops > self.components.len() {
                return None;
            }
            current = target;
        }
        (hops > 0).then_some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_alias_chain() {
        let mut config = StitchConfig::default();

        config
            .components
            .insert("a".to_string(), "/srv/stack/db".to_string());
        config.components.insert("b".to_string(), "a".to_string());
        assert!(config.validate().is_ok());

        config.components.insert("a".to_string(), "b".to_string());
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Circular alias dependency")));
    }

    #[test]
    fn test_alias_chain_error_shows_full_path() {
        let mut config = StitchConfig::default();
        config.components.insert("a".to_string(), "b".to_string());
        config.components.insert("b".to_string(), "c".to_string());
        config.components.insert("c".to_string(), "a".to_string());

        let errors = config.validate().unwrap_err();
        assert!(errors.join("\n").contains("a → b → c → a"));
    }

    #[test]
    fn test_resolve_alias_multi_hop() {
        let mut config = StitchConfig::default();
        config
            .components
            .insert("db".to_string(), "/srv/stack/postgres".to_string());
        config.components.insert("store".to_string(), "db".to_string());

        assert_eq!(config.resolve_alias("store"), Some("/srv/stack/postgres"));
        assert_eq!(config.resolve_alias("db"), Some("/srv/stack/postgres"));
        assert_eq!(config.resolve_alias("cache"), None);
    }

    #[test]
    fn test_resolve_alias_to_search_path_name() {
        let mut config = StitchConfig::default();
        config.components.insert("pg".to_string(), "postgres".to_string());
        assert_eq!(config.resolve_alias("pg"), Some("postgres"));
    }

    #[test]
    fn test_partial_config_gets_default_merge_keys() {
        let config: StitchConfig = toml::from_str("search_paths = [\"/srv\"]").unwrap();
        assert_eq!(config.search_paths, vec!["/srv".to_string()]);
        assert_eq!(config.merge, MergeSettings::default());
        assert!(config.merge_policy().is_concat_key("NO_PROXY"));
    }

    #[test]
    fn test_custom_concat_keys() {
        let config: StitchConfig = toml::from_str("[merge]\nconcat_keys = [\"JAVA_OPTS\"]").unwrap();
        let policy = config.merge_policy();
        assert!(policy.is_concat_key("JAVA_OPTS"));
        assert!(!policy.is_concat_key("NO_PROXY"));
    }

    #[test]
    fn test_empty_concat_key_rejected() {
        let mut config = StitchConfig::default();
        config.merge.concat_keys.push(" ".to_string());
        assert!(config.validate().is_err());
    }
}
