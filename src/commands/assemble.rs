//! `stitch assemble`: resolve a stack and write its staging directory

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ResolveOptions, output, resolve_stack, validation};
use crate::compose::{FRAGMENTS_DIR, INCLUDE_FILE, Resolution};
use crate::config::StitchConfig;

/// Options for the assemble command
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub resolve: ResolveOptions,
    /// Staging directory
    pub output_dir: PathBuf,
    /// Reuse a non-empty staging directory, replacing previously staged fragments
    pub force: bool,
}

/// Resolve the stack and stage one fragment per component plus the include file
pub fn run(config: StitchConfig, options: AssembleOptions) -> Result<()> {
    let output_dir = validation::resolve_output_dir(&options.output_dir)?;
    validation::validate_output_dir(&output_dir, options.force)?;

    let resolution = resolve_stack(config, &options.resolve)?;
    output::print_resolution_order(&resolution);
    output::print_report(&resolution.report);

    let include_file = write_staging(&resolution, &output_dir)?;
    output::print_success_message(&output_dir, &include_file);

    Ok(())
}

/// Write every resolved fragment and the include document into `output_dir`
///
/// Fragments from an earlier run are removed first, so `fragments/` only
/// holds what the include document lists. Returns the path of the include
/// document.
pub fn write_staging(resolution: &Resolution, output_dir: &Path) -> Result<PathBuf> {
    let paths = resolution.staged_paths()?;
    let include = resolution.include_document()?;

    let fragments_dir = output_dir.join(FRAGMENTS_DIR);
    if fragments_dir.exists() {
        fs::remove_dir_all(&fragments_dir).context(format!(
            "Failed to clear previously staged fragments: {}",
            fragments_dir.display()
        ))?;
    }
    fs::create_dir_all(&fragments_dir).context(format!(
        "Failed to create output directory: {}",
        fragments_dir.display()
    ))?;

    for (entry, relative) in resolution.entries.iter().zip(&paths) {
        let path = output_dir.join(relative);
        write_yaml(&path, &entry.fragment)?;
        info!(component = %entry.name, path = %path.display(), "staged fragment");
    }

    let include_file = output_dir.join(INCLUDE_FILE);
    write_yaml(&include_file, &include)?;

    Ok(include_file)
}

fn write_yaml(path: &Path, value: &serde_yaml::Value) -> Result<()> {
    let content = serde_yaml::to_string(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
