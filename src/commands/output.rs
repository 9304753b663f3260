//! Output formatting for resolution results
//!
//! ```text
//! Resolved 3 components:
//!    1. db
//!    ↓
//!    2. metrics
//!    ↓
//!    3. app (local)
//! ```

use serde_json::json;
use std::path::Path;

use crate::compose::{Resolution, ResolutionReport, fragment_file_name};

/// Print the startup order of a resolution
pub fn print_resolution_order(resolution: &Resolution) {
    let count = resolution.entries.len();
    println!(
        "\nResolved {} component{}:",
        count,
        if count == 1 { "" } else { "s" }
    );
    for (i, entry) in resolution.entries.iter().enumerate() {
        if i > 0 {
            println!("   ↓");
        }
        let mut line = format!("   {}. {}", i + 1, entry.name);
        if entry.is_local {
            line.push_str(" (local)");
        }
        if !entry.profiles.is_empty() {
            line.push_str(&format!(" [{}]", entry.profiles.join(", ")));
        }
        println!("{}", line);
    }
}

/// Print applied and dropped modifications and triggered wire rules
pub fn print_report(report: &ResolutionReport) {
    let modifications = &report.modifications;
    if !modifications.applied.is_empty() {
        println!("\nModifications:");
        for outcome in &modifications.applied {
            println!("   {} → {}", outcome.origin, outcome.target);
        }
    }
    if !modifications.dropped.is_empty() {
        println!("\nDropped modifications (target not resolved):");
        for outcome in &modifications.dropped {
            println!("   {} → {}", outcome.origin, outcome.target);
        }
    }
    if !report.triggered_rules.is_empty() {
        println!("\nWire rules:");
        for rule in &report.triggered_rules {
            println!("   {} (when {} is present)", rule.source, rule.trigger);
        }
    }
}

/// Print where the staged files were written and how to use them
pub fn print_success_message(output_dir: &Path, include_file: &Path) {
    println!("\nStaged: {}", output_dir.display());
    println!("\nTo start the stack:");
    println!("  docker compose -f {} up", include_file.display());
}

/// Machine-readable form of a resolution
pub fn resolution_json(resolution: &Resolution) -> serde_json::Value {
    let components: Vec<_> = resolution
        .entries
        .iter()
        .map(|entry| {
            json!({
                "name": entry.name,
                "file": fragment_file_name(&entry.name),
                "local": entry.is_local,
                "profiles": entry.profiles,
            })
        })
        .collect();

    let outcomes = |list: &[crate::compose::ModificationOutcome]| -> Vec<serde_json::Value> {
        list.iter()
            .map(|o| json!({ "source": o.origin, "target": o.target }))
            .collect()
    };
    let report = &resolution.report;

    json!({
        "components": components,
        "modifications": {
            "applied": outcomes(&report.modifications.applied),
            "dropped": outcomes(&report.modifications.dropped),
        },
        "wire_rules": report
            .triggered_rules
            .iter()
            .map(|r| json!({ "source": r.source, "trigger": r.trigger }))
            .collect::<Vec<_>>(),
    })
}
