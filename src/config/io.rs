//! Configuration file I/O operations
//!
//! Every load and save validates the config.

use super::paths::get_config_path;
use super::schema::StitchConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Names that would be confusing next to CLI commands or flags
const RESERVED: &[&str] = &[
    "help", "version", "assemble", "graph", "registry", "component", "add", "remove", "list",
    "info",
];

/// Load configuration from the user config file
///
/// Returns a default (empty) config if the file doesn't exist.
pub fn load_config() -> Result<StitchConfig> {
    load_config_from(&get_config_path()?)
}

/// Load and validate configuration from `path`
pub fn load_config_from(path: &Path) -> Result<StitchConfig> {
    if !path.exists() {
        return Ok(StitchConfig::default());
    }

    let content =
        fs::read_to_string(path).context(format!("Failed to read config: {}", path.display()))?;

    let config: StitchConfig =
        toml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Config validation failed in {}:\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }

    Ok(config)
}

/// Save configuration to the user config file
pub fn save_config(config: &StitchConfig) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

/// Validate and write configuration to `path`, creating parent directories
pub fn save_config_to(path: &Path, config: &StitchConfig) -> Result<()> {
    if let Err(errors) = config.validate() {
        anyhow::bail!("cannot save invalid config:\n  {}", errors.join("\n  "));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(format!(
            "Failed to create config directory: {}",
            parent.display()
        ))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content).context(format!("Failed to write config: {}", path.display()))?;

    Ok(())
}

/// Load → modify → validate → save
pub fn update_config<F>(f: F) -> Result<()>
where
    F: FnOnce(&mut StitchConfig) -> Result<()>,
{
    let path = get_config_path()?;
    let mut config = load_config_from(&path)?;
    f(&mut config)?;
    save_config_to(&path, &config)
}

/// Validate an alias name
///
/// Names must be non-empty, contain only alphanumeric characters, hyphens,
/// or underscores, and not be reserved words.
fn validate_identifier(name: &str, kind: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("{} name cannot be empty", kind);
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!(
            "{} name '{}' must contain only alphanumeric characters, hyphens, or underscores",
            kind,
            name
        );
    }

    if RESERVED.contains(&name) {
        anyhow::bail!("{} name '{}' is reserved", kind, name);
    }

    Ok(())
}

/// Add or update a component alias
///
/// Path specs are canonicalized so the alias works from any directory.
pub fn register_component(alias: &str, spec: &str) -> Result<()> {
    use super::utils;

    validate_identifier(alias, "alias")?;

    if utils::is_registry_spec(spec) {
        anyhow::bail!(
            "'{}' looks like a registry package; only local paths and other aliases can be registered",
            spec
        );
    }

    let final_spec = if utils::is_path_spec(spec) {
        utils::canonicalize_path(spec)?
            .to_string_lossy()
            .to_string()
    } else {
        spec.to_string()
    };

    update_config(|config| {
        config.components.insert(alias.to_string(), final_spec);
        Ok(())
    })
}

/// Remove a component alias
///
/// Returns an error if the alias doesn't exist.
pub fn unregister_component(alias: &str) -> Result<()> {
    update_config(|config| {
        if config.components.remove(alias).is_none() {
            anyhow::bail!("alias '{}' not found", alias);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, StitchConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = StitchConfig::default();
        config
            .components
            .insert("db".to_string(), "/srv/stack/postgres".to_string());
        config.search_paths.push("/srv/stack".to_string());

        save_config_to(&config_path, &config).unwrap();
        let loaded = load_config_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_merge_section_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        save_config_to(&config_path, &StitchConfig::default()).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("[merge]"));
    }

    #[test]
    fn test_load_rejects_circular_aliases() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[components]\na = \"b\"\nb = \"a\"\n").unwrap();

        let err = load_config_from(&config_path).unwrap_err();
        assert!(err.to_string().contains("Config validation failed"));
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = StitchConfig::default();
        config.components.insert("a".to_string(), "a".to_string());

        assert!(save_config_to(&config_path, &config).is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_validate_identifier_valid_names() {
        assert!(validate_identifier("db", "alias").is_ok());
        assert!(validate_identifier("my_db", "alias").is_ok());
        assert!(validate_identifier("my-db", "alias").is_ok());
        assert!(validate_identifier("db16", "alias").is_ok());
    }

    #[test]
    fn test_validate_identifier_empty_name() {
        let result = validate_identifier("", "alias");
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_identifier_invalid_characters() {
        for name in ["my db", "my.db", "my/db", "my\\db", "my:db", "db!"] {
            let result = validate_identifier(name, "alias");
            assert!(
                result.is_err(),
                "Expected '{}' to be invalid, but it was accepted",
                name
            );
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("must contain only alphanumeric")
            );
        }
    }

    #[test]
    fn test_validate_identifier_reserved_names() {
        for name in RESERVED {
            let result = validate_identifier(name, "alias");
            assert!(result.unwrap_err().to_string().contains("is reserved"));
        }
    }
}
