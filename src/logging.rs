use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::paths;

/// Initialize logging for the stitch CLI
///
/// Logs go to stderr and, when the platform data directory is usable, to a
/// daily-rotated file under `<data_dir>/stitch/logs/`:
/// - XDG_DATA_HOME/stitch/logs/ on Unix (typically ~/.local/share/stitch/logs/)
/// - ~/Library/Application Support/stitch/logs/ on macOS
/// - {FOLDERID_LocalAppData}/stitch/logs/ on Windows
///
/// RUST_LOG takes precedence over the default filter:
/// - RUST_LOG=debug stitch assemble .  (verbose logging)
/// - RUST_LOG=warn stitch assemble .   (warnings only)
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let log_dir = usable_log_dir();
    let file_layer = log_dir.as_ref().map(|dir| {
        tracing_subscriber::fmt::layer()
            .with_writer(tracing_appender::rolling::daily(dir, "stitch.log"))
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    match log_dir {
        Some(dir) => tracing::debug!("Logging initialized to {}", dir.display()),
        None => tracing::debug!("No usable data directory, logging to stderr only"),
    }

    Ok(())
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "stitch=debug" } else { "stitch=info" }
}

/// Log directory, created on demand; `None` when it cannot be used
fn usable_log_dir() -> Option<PathBuf> {
    let dir = paths::get_log_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
