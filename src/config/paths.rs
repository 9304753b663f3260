//! Directory path management for stitch

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the base stitch directory (~/.config/stitch/)
pub fn get_stitch_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Failed to get config directory")?
        .join("stitch"))
}

/// Get the config file path (~/.config/stitch/config.toml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_stitch_dir()?.join("config.toml"))
}

/// Get the log directory (~/.local/share/stitch/logs/ on Unix)
pub fn get_log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .context("Failed to determine data directory (XDG_DATA_HOME or platform equivalent)")?;

    Ok(data_dir.join("stitch").join("logs"))
}
