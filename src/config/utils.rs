//! Component spec classification
//!
//! Components can be referenced in three forms:
//!
//! 1. **File paths** (e.g., `./db`, `~/stack/db`, `base.yaml`)
//!    - Have explicit path indicators: `./`, `../`, `~/`, absolute paths
//!    - Contain path separators: `/` or `\`
//!    - End with a `.yaml` or `.yml` extension
//!
//! 2. **Registry packages** (e.g., `acme:postgres`)
//!    - Contain a colon `:` separating namespace and name
//!    - Remote sources are not supported; these are reported as lookup errors
//!
//! 3. **Names** (e.g., `db`, `metrics`)
//!    - Resolved through the config file's aliases, then the search paths
//!
//! Paths are checked first, so `C:\stack\db` is a path even though it
//! contains a colon.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Fragment file extensions recognized without a path separator
const YAML_EXTENSIONS: &[&str] = &[".yaml", ".yml"];

/// Determine if a spec looks like a local file path
///
/// ```
/// use stitch::config::utils::is_path_spec;
///
/// assert!(is_path_spec("./db"));
/// assert!(is_path_spec("../shared/db"));
/// assert!(is_path_spec("/srv/stack/db"));
/// assert!(is_path_spec("~/stack/db"));
/// assert!(is_path_spec("base.yaml"));
/// assert!(!is_path_spec("acme:postgres"));
/// assert!(!is_path_spec("db")); // Could be an alias
/// ```
pub fn is_path_spec(spec: &str) -> bool {
    if spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with("~/")
        || spec.starts_with('/')
        || spec.starts_with('\\')
        || spec == "."
        || spec == ".."
    {
        return true;
    }

    if spec.contains('/') || spec.contains('\\') {
        return true;
    }

    YAML_EXTENSIONS.iter().any(|ext| spec.ends_with(ext))
}

/// Determine if a spec looks like a registry package spec (`namespace:name`)
///
/// ```
/// use stitch::config::utils::is_registry_spec;
///
/// assert!(is_registry_spec("acme:postgres"));
/// assert!(!is_registry_spec("./db"));
/// assert!(!is_registry_spec("db"));
/// ```
pub fn is_registry_spec(spec: &str) -> bool {
    !is_path_spec(spec) && spec.contains(':')
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(spec: &str) -> Result<PathBuf> {
    match spec.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir()
            .context("cannot determine home directory")?
            .join(rest)),
        None => Ok(PathBuf::from(spec)),
    }
}

/// Canonicalize a path spec to an absolute, existing path
///
/// Symlinks are followed, so the result may lie outside the directory the
/// spec was written relative to.
pub fn canonicalize_path(spec: &str) -> Result<PathBuf> {
    let path = expand_home(spec)?;
    path.canonicalize().map_err(|e| {
        anyhow::anyhow!(
            "path does not exist or cannot be resolved: '{}'\nerror: {}",
            spec,
            e
        )
    })
}
