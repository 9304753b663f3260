//! Staging directory checks

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Resolve the staging path against the current working directory
pub fn resolve_output_dir(output: &Path) -> Result<PathBuf> {
    if output.is_absolute() {
        Ok(output.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Ok(cwd.join(output))
    }
}

/// Refuse to write into a non-empty staging directory unless `force` is set
///
/// A missing directory is fine; it is created on write.
pub fn validate_output_dir(output_dir: &Path, force: bool) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }

    if !output_dir.is_dir() {
        anyhow::bail!("output path '{}' is not a directory", output_dir.display());
    }

    let metadata = std::fs::metadata(output_dir).context(format!(
        "failed to read directory metadata for '{}'",
        output_dir.display()
    ))?;
    if metadata.permissions().readonly() {
        anyhow::bail!("output directory '{}' is not writable", output_dir.display());
    }

    let non_empty = std::fs::read_dir(output_dir)
        .context(format!("failed to read '{}'", output_dir.display()))?
        .next()
        .is_some();
    if non_empty && !force {
        anyhow::bail!(
            "output directory '{}' is not empty, use --force to overwrite",
            output_dir.display()
        );
    }

    Ok(())
}
