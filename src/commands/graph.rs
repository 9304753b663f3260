//! `stitch graph`: show the resolved order without writing anything

use anyhow::{Context, Result};

use super::{ResolveOptions, output, resolve_stack};
use crate::config::StitchConfig;
use crate::types::OutputFormat;

pub fn run(config: StitchConfig, options: &ResolveOptions, format: OutputFormat) -> Result<()> {
    let resolution = resolve_stack(config, options)?;

    match format {
        OutputFormat::Text => {
            output::print_resolution_order(&resolution);
            output::print_report(&resolution.report);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&output::resolution_json(&resolution))
                .context("Failed to serialize resolution")?;
            println!("{}", json);
        }
    }

    Ok(())
}
